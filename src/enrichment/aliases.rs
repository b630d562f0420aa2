//! Spec-key canonicalization. Semantically duplicate keys collapse to a
//! single canonical form so evidence from OEM pages, distributor tables and
//! datasheets merges instead of fragmenting. Hand-maintained data table;
//! extend it as new sources surface new spellings.

/// (canonical form, accepted aliases). Matching is case-insensitive on the
/// trimmed key; canonical forms always map to themselves.
pub const KEY_ALIASES: &[(&str, &[&str])] = &[
    (
        "Nominal AC Line Voltage (VRMS)",
        &[
            "System Voltage",
            "Voltage",
            "Nominal Ac Line Voltage Vrms",
            "Nominal AC Line Voltage",
            "Line Voltage",
            "Nominal Voltage",
        ],
    ),
    (
        "Maximum Continuous Operating Voltage (MCOV)",
        &[
            "MCOV",
            "Max Continuous Operating Voltage",
            "Maximum Continuous Operating Voltage",
            "Maximum Continuous Operating Voltage Mcov",
        ],
    ),
    (
        "Short Circuit Current Rating (SCCR)",
        &[
            "SCCR",
            "Short Circuit Current Rating",
            "Short-Circuit Current Rating",
            "Short Circuit Current Rating Sccr",
        ],
    ),
    ("Phase", &["Phases", "Phase Configuration"]),
    (
        "Frequency Range - USA/Euro Std",
        &["Frequency", "Frequency Range", "Operating Frequency"],
    ),
    (
        "Surge Current Capacity (Per Phase)",
        &[
            "Surge Current Per Phase",
            "Surge Capacity Per Phase",
            "Peak Surge Current Per Phase",
            "Surge Current Capacity Per Phase",
        ],
    ),
    (
        "Surge Current Capacity (Per Mode)",
        &["Surge Current Per Mode", "Surge Capacity Per Mode", "Surge Current Capacity Per Mode"],
    ),
    (
        "Voltage Protection Rating (VPR)",
        &["VPR", "Voltage Protection Rating", "Voltage Protection Rating Vpr"],
    ),
    (
        "Nominal Discharge Current (In)",
        &["Nominal Discharge Current", "In Rating", "Nominal Discharge Current In"],
    ),
    ("Protection Modes", &["Modes of Protection", "Protected Modes"]),
    (
        "Enclosure Type (NEMA)",
        &["Enclosure", "Enclosure Type", "NEMA Rating"],
    ),
    (
        "Enclosure Size (HxWxD)",
        &["Enclosure Size", "Dimensions", "Dimensions (HxWxD)", "Enclosure Size Hxwxd"],
    ),
    ("Operating Temperature", &["Operating Temp", "Temperature Range"]),
    ("Relative Humidity", &["Humidity"]),
    ("Weight", &["Unit Weight"]),
    (
        "Remote Alarm",
        &["Remote Alarm Contacts", "Remote Alarm Option"],
    ),
    ("Warranty", &["Warranty Period"]),
    ("Product Type", &["Device Type", "Product Category"]),
    ("Max Service Size", &["Service Size", "Maximum Service Size"]),
    ("SPD Type", &["UL Type", "SPD Classification"]),
    ("Response Time", &["Reaction Time"]),
    ("Status Indication", &["Status Indicators", "Diagnostics"]),
];

/// Collapse a spec key onto its canonical form. Unknown keys pass through
/// trimmed but otherwise untouched. Idempotent by construction:
/// `canonicalize(canonicalize(k)) == canonicalize(k)`.
pub fn canonicalize(key: &str) -> String {
    let trimmed = key.trim();
    for (canonical, aliases) in KEY_ALIASES {
        if trimmed.eq_ignore_ascii_case(canonical) {
            return (*canonical).to_string();
        }
        if aliases.iter().any(|a| trimmed.eq_ignore_ascii_case(a)) {
            return (*canonical).to_string();
        }
    }
    trimmed.to_string()
}
