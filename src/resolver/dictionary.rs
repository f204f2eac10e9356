//! Bidirectional synonym dictionary between local-language product terms
//! and the names the global archives publish.

/// Static dictionary: canonical local term -> known source-language
/// synonyms. Both directions are consulted by the resolver.
#[derive(Debug, Clone)]
pub struct SynonymDictionary {
    entries: Vec<(String, Vec<String>)>,
}

impl SynonymDictionary {
    /// Built-in vocabulary covering the commodities the feeds report.
    pub fn builtin() -> Self {
        let raw: &[(&str, &[&str])] = &[
            ("alma", &["apple", "apples", "dessert apple"]),
            ("armud", &["pear", "pears"]),
            ("heyva", &["quince"]),
            ("üzüm", &["grape", "grapes", "table grape"]),
            ("nar", &["pomegranate", "pomegranates"]),
            ("xurma", &["persimmon", "persimmons", "date"]),
            ("qarpız", &["watermelon", "watermelons"]),
            ("yemiş", &["melon", "melons"]),
            ("kartof", &["potato", "potatoes", "ware potato"]),
            ("pomidor", &["tomato", "tomatoes"]),
            ("xiyar", &["cucumber", "cucumbers", "gherkin"]),
            ("soğan", &["onion", "onions", "dry onion"]),
            ("sarımsaq", &["garlic"]),
            ("kələm", &["cabbage", "cabbages", "white cabbage"]),
            ("yerkökü", &["carrot", "carrots"]),
            ("badımcan", &["eggplant", "aubergine"]),
            ("bibər", &["pepper", "peppers", "sweet pepper"]),
            ("buğda", &["wheat", "milling wheat"]),
            ("un", &["wheat flour", "flour"]),
            ("arpa", &["barley", "feed barley"]),
            ("qarğıdalı", &["maize", "corn", "maize (corn)"]),
            ("düyü", &["rice", "milled rice", "paddy"]),
            ("mal əti", &["beef", "beef meat", "cattle meat"]),
            ("qoyun əti", &["mutton", "lamb", "sheep meat"]),
            ("toyuq əti", &["chicken", "poultry", "chicken meat"]),
            ("süd", &["milk", "raw milk", "fresh milk"]),
            ("yumurta", &["egg", "eggs", "hen eggs"]),
            ("kərə yağı", &["butter"]),
            ("şəkər", &["sugar", "white sugar"]),
            ("günəbaxan yağı", &["sunflower oil", "sunflower-seed oil"]),
        ];
        let entries = raw
            .iter()
            .map(|(term, synonyms)| {
                (
                    term.to_lowercase(),
                    synonyms.iter().map(|s| s.to_lowercase()).collect(),
                )
            })
            .collect();
        SynonymDictionary { entries }
    }

    /// Synonyms for an exact canonical term (trimmed, case-insensitive).
    pub fn synonyms(&self, local_term: &str) -> Option<&[String]> {
        let needle = local_term.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(term, _)| *term == needle)
            .map(|(_, synonyms)| synonyms.as_slice())
    }

    /// Iterate all `(canonical term, synonyms)` pairs, lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(term, synonyms)| (term.as_str(), synonyms.as_slice()))
    }
}

impl Default for SynonymDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}
