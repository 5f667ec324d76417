use std::sync::OnceLock;

use regex::Regex;

/// Fields carried in a feed entry title:
/// `"<FORM> - <Company> (<CIK>) (<Role>)"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    pub form_type: String,
    pub company: String,
    /// CIK zero-padded to 10 digits.
    pub external_id: String,
    pub role: String,
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Company names may themselves contain " - " and parentheses
    RE.get_or_init(|| {
        Regex::new(r"^(?P<form>.+?) - (?P<company>.+) \((?P<cik>\d{1,10})\) \((?P<role>[^()]+)\)$")
            .expect("static title regex is valid")
    })
}

/// Left-pads a numeric CIK to 10 digits. Returns `None` for anything that
/// is not 1 to 10 ASCII digits.
pub fn normalize_cik(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>10}", raw))
}

pub fn parse_title(title: &str) -> Option<ParsedTitle> {
    let caps = title_regex().captures(title.trim())?;

    Some(ParsedTitle {
        form_type: caps["form"].trim().to_string(),
        company: caps["company"].trim().to_string(),
        external_id: normalize_cik(&caps["cik"])?,
        role: caps["role"].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_title() {
        let parsed = parse_title("10-K - Example Co. (0000123456) (Filer)").unwrap();
        assert_eq!(
            parsed,
            ParsedTitle {
                form_type: "10-K".to_string(),
                company: "Example Co.".to_string(),
                external_id: "0000123456".to_string(),
                role: "Filer".to_string(),
            }
        );
    }

    #[test]
    fn test_company_with_dash_and_parentheses() {
        let parsed =
            parse_title("SC 13G/A - Alpha - Beta Holdings (Cayman) Ltd (0001234567) (Subject)")
                .unwrap();
        assert_eq!(parsed.form_type, "SC 13G/A");
        assert_eq!(parsed.company, "Alpha - Beta Holdings (Cayman) Ltd");
        assert_eq!(parsed.external_id, "0001234567");
        assert_eq!(parsed.role, "Subject");
    }

    #[test]
    fn test_short_cik_is_padded() {
        let parsed = parse_title("8-K - Tiny Corp (320193) (Filer)").unwrap();
        assert_eq!(parsed.external_id, "0000320193");
    }

    #[test]
    fn test_rejects_malformed_titles() {
        assert!(parse_title("Quarterly report for Example Co.").is_none());
        assert!(parse_title("10-K - Example Co. (ABC) (Filer)").is_none());
        assert!(parse_title("10-K - Example Co. (0000123456)").is_none());
    }

    #[test]
    fn test_normalize_cik() {
        assert_eq!(normalize_cik("320193").as_deref(), Some("0000320193"));
        assert_eq!(normalize_cik("0000320193").as_deref(), Some("0000320193"));
        assert!(normalize_cik("12345678901").is_none());
        assert!(normalize_cik("12a").is_none());
        assert!(normalize_cik("").is_none());
    }
}
