use regex::Regex;

/// Tags for the pack-size rules, in priority order. The patterns overlap
/// ("6-pack 4x6" satisfies both the pack rule and the multiplier rule), so
/// evaluation order is part of the contract and the matched tag is reported
/// back for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackRule {
    XPack,
    XPk,
    XBtls,
    Multiplier,
    Single,
}

impl PackRule {
    #[allow(dead_code)]
    pub fn label(&self) -> &'static str {
        match self {
            PackRule::XPack => "X-pack",
            PackRule::XPk => "X pk",
            PackRule::XBtls => "X btls",
            PackRule::Multiplier => "* or &",
            PackRule::Single => "single",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackExtraction {
    pub units_per_pack: Option<f64>,
    pub total_units: Option<f64>,
    pub rule: Option<PackRule>,
}

impl PackExtraction {
    fn none() -> Self {
        PackExtraction {
            units_per_pack: None,
            total_units: None,
            rule: None,
        }
    }
}

/// Recovers units-per-package counts from free-text product descriptions
/// ("Pilsner 6-pack", "12 btls", "4x6 case", ...).
pub struct PackSizeExtractor {
    rules: Vec<(PackRule, Regex)>,
}

impl PackSizeExtractor {
    pub fn new() -> Self {
        let rules = vec![
            (PackRule::XPack, Regex::new(r"(\d+)-pack").unwrap()),
            (PackRule::XPk, Regex::new(r"(\d+)\s*pk").unwrap()),
            (PackRule::XBtls, Regex::new(r"(\d+)\s*btls").unwrap()),
            (
                PackRule::Multiplier,
                Regex::new(r"(\d+)\s*[*&x×]\s*(\d+)").unwrap(),
            ),
            (PackRule::Single, Regex::new(r"\bsingle\b").unwrap()),
        ];
        PackSizeExtractor { rules }
    }

    /// First matching rule wins. Returns all-`None` when nothing matches;
    /// consumers must tolerate null `total_units`.
    pub fn extract(&self, text: &str, quantity: f64) -> PackExtraction {
        let text = text.to_lowercase();

        for (rule, pattern) in &self.rules {
            let Some(caps) = pattern.captures(&text) else {
                continue;
            };
            match rule {
                PackRule::XPack | PackRule::XPk | PackRule::XBtls => {
                    if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                        return PackExtraction {
                            units_per_pack: Some(n),
                            total_units: Some(quantity * n),
                            rule: Some(*rule),
                        };
                    }
                }
                PackRule::Multiplier => {
                    let a = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok());
                    let b = caps.get(2).and_then(|m| m.as_str().parse::<u64>().ok());
                    let (Some(a), Some(b)) = (a, b) else { continue };
                    // "4x4" repeats in some descriptions to stack case
                    // multiples; "4x6" does not.
                    let total = if a == b {
                        let occurrences = pattern
                            .captures_iter(&text)
                            .filter(|c| {
                                c.get(1).map(|m| m.as_str().parse::<u64>().ok()) == Some(Some(a))
                                    && c.get(2).map(|m| m.as_str().parse::<u64>().ok())
                                        == Some(Some(a))
                            })
                            .count()
                            .max(1);
                        occurrences as f64 * b as f64 * quantity
                    } else {
                        a as f64 * b as f64 * quantity
                    };
                    return PackExtraction {
                        units_per_pack: Some(b as f64),
                        total_units: Some(total),
                        rule: Some(*rule),
                    };
                }
                PackRule::Single => {
                    return PackExtraction {
                        units_per_pack: Some(1.0),
                        total_units: Some(quantity),
                        rule: Some(*rule),
                    };
                }
            }
        }

        PackExtraction::none()
    }
}

/// Case notation used by distributor price books: "4/6x355ml" means 4 packs
/// per case of 6 units each. Returns (packs_per_case, units_per_pack).
pub fn case_pack_notation(text: &str) -> Option<(f64, f64)> {
    let re = Regex::new(r"(\d+)/(\d+)x").unwrap();
    let caps = re.captures(&text.to_lowercase())?;
    let packs = caps.get(1)?.as_str().parse().ok()?;
    let units = caps.get(2)?.as_str().parse().ok()?;
    Some((packs, units))
}

/// Variant-name notation "…/6*355ml" carrying only the units count. Used as
/// a fallback when the rule table extracts nothing.
pub fn slash_pack_notation(text: &str) -> Option<f64> {
    let re = Regex::new(r"/(\d+)\*").unwrap();
    re.captures(&text.to_lowercase())?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
