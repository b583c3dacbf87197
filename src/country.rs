/// Normalizes a user-supplied country name to its ISO 3166-1 alpha-2 code
/// and a coarse region. Unknown countries yield `None` and the derived
/// columns are left untouched.
pub fn country_details(country: &str) -> Option<(&'static str, &'static str)> {
    let normalized = country.trim().to_lowercase();
    let details = match normalized.as_str() {
        "united states" | "usa" | "united states of america" => ("US", "Americas"),
        "canada" => ("CA", "Americas"),
        "mexico" => ("MX", "Americas"),
        "brazil" => ("BR", "Americas"),
        "argentina" => ("AR", "Americas"),
        "united kingdom" | "uk" | "great britain" => ("GB", "Europe"),
        "ireland" => ("IE", "Europe"),
        "france" => ("FR", "Europe"),
        "germany" => ("DE", "Europe"),
        "spain" => ("ES", "Europe"),
        "portugal" => ("PT", "Europe"),
        "italy" => ("IT", "Europe"),
        "netherlands" => ("NL", "Europe"),
        "belgium" => ("BE", "Europe"),
        "switzerland" => ("CH", "Europe"),
        "austria" => ("AT", "Europe"),
        "sweden" => ("SE", "Europe"),
        "norway" => ("NO", "Europe"),
        "denmark" => ("DK", "Europe"),
        "finland" => ("FI", "Europe"),
        "poland" => ("PL", "Europe"),
        "ukraine" => ("UA", "Europe"),
        "turkey" | "turkiye" => ("TR", "Asia"),
        "russia" | "russian federation" => ("RU", "Europe"),
        "china" => ("CN", "Asia"),
        "japan" => ("JP", "Asia"),
        "south korea" | "korea" => ("KR", "Asia"),
        "india" => ("IN", "Asia"),
        "pakistan" => ("PK", "Asia"),
        "bangladesh" => ("BD", "Asia"),
        "indonesia" => ("ID", "Asia"),
        "philippines" => ("PH", "Asia"),
        "vietnam" => ("VN", "Asia"),
        "thailand" => ("TH", "Asia"),
        "singapore" => ("SG", "Asia"),
        "malaysia" => ("MY", "Asia"),
        "saudi arabia" => ("SA", "Asia"),
        "united arab emirates" | "uae" => ("AE", "Asia"),
        "israel" => ("IL", "Asia"),
        "egypt" => ("EG", "Africa"),
        "nigeria" => ("NG", "Africa"),
        "kenya" => ("KE", "Africa"),
        "south africa" => ("ZA", "Africa"),
        "morocco" => ("MA", "Africa"),
        "australia" => ("AU", "Oceania"),
        "new zealand" => ("NZ", "Oceania"),
        _ => return None,
    };
    Some(details)
}
