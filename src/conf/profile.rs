use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use tracing::warn;

use crate::conf::error::ConfigError;
use crate::conf::ini::Section;
use crate::conf::layout::Layout;
use crate::encoding;

pub const ENCODING_KEY: &str = "encoding";
pub const TIMEZONE_KEY: &str = "timezone";
pub const TYPE_KEY: &str = "type";
pub const HEAD_KEY: &str = "head";
pub const BODY_KEY: &str = "body";
pub const CARDNUMBER_KEY: &str = "cardnumber";
pub const CARDNAME_KEY: &str = "cardname";

const KNOWN_KEYS: &[&str] = &[
    ENCODING_KEY,
    TIMEZONE_KEY,
    TYPE_KEY,
    HEAD_KEY,
    BODY_KEY,
    CARDNUMBER_KEY,
    CARDNAME_KEY,
];

/// Class of account the CSV export describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountType {
    Credit,
    Bank,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Credit => "credit",
            AccountType::Bank => "bank",
        }
    }
}

impl FromStr for AccountType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(AccountType::Credit),
            "bank" => Ok(AccountType::Bank),
            _ => Err(()),
        }
    }
}

/// Fully-resolved settings for one issuer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    pub issuer: String,
    pub account_type: AccountType,
    /// Encoding label of the CSV files; checked when a file is read.
    pub encoding: String,
    pub timezone: String,
    /// `None` when the CSV files have no header row.
    pub head: Option<Layout>,
    pub body: Layout,
    pub cardnumber: String,
    pub cardname: String,
}

impl Profile {
    pub fn from_resolved(issuer: &str, resolved: &Section) -> Result<Self, ConfigError> {
        for (key, _) in resolved.iter() {
            if !KNOWN_KEYS.contains(&key) {
                warn!(section = issuer, key, "ignoring unknown key");
            }
        }

        let get = |key: &str| resolved.get(key).unwrap_or_default().to_string();

        let type_value = resolved.get(TYPE_KEY).unwrap_or_default();
        let account_type =
            type_value
                .parse::<AccountType>()
                .map_err(|_| ConfigError::InvalidValue {
                    section: issuer.to_string(),
                    key: TYPE_KEY.to_string(),
                    value: type_value.to_string(),
                })?;

        let head = resolved
            .get(HEAD_KEY)
            .map(|value| Layout::parse_head(issuer, value))
            .transpose()?;
        let body = match resolved.get(BODY_KEY) {
            Some(value) => Layout::parse_body(issuer, value)?,
            None => {
                return Err(ConfigError::invalid_layout(
                    issuer,
                    BODY_KEY,
                    "no body layout defined",
                ))
            }
        };

        Ok(Self {
            issuer: issuer.to_string(),
            account_type,
            encoding: get(ENCODING_KEY),
            timezone: get(TIMEZONE_KEY),
            head,
            body,
            cardnumber: get(CARDNUMBER_KEY),
            cardname: get(CARDNAME_KEY),
        })
    }

    /// Looks up the CSV encoding. `from_resolved` does not check the label;
    /// an unknown one fails here, when a file is about to be read.
    pub fn csv_encoding(&self) -> Result<&'static Encoding, ConfigError> {
        encoding::lookup(&self.encoding).ok_or_else(|| ConfigError::UnsupportedEncoding {
            section: self.issuer.clone(),
            key: ENCODING_KEY.to_string(),
            label: self.encoding.clone(),
        })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[{}]", self.issuer)?;
        writeln!(f, "{}={}", TYPE_KEY, self.account_type.as_str())?;
        writeln!(f, "{}={}", ENCODING_KEY, self.encoding)?;
        writeln!(f, "{}={}", TIMEZONE_KEY, self.timezone)?;
        if let Some(head) = &self.head {
            writeln!(f, "{}={}", HEAD_KEY, head)?;
        }
        writeln!(f, "{}={}", BODY_KEY, self.body)?;
        writeln!(f, "{}={}", CARDNUMBER_KEY, self.cardnumber)?;
        writeln!(f, "{}={}", CARDNAME_KEY, self.cardname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    fn section(pairs: &[(&str, &str)]) -> Section {
        pairs.iter().copied().collect()
    }

    #[test]
    fn from_resolved_section() {
        let profile = Profile::from_resolved(
            "visa",
            &section(&[
                ("encoding", "cp932"),
                ("timezone", "JST-9"),
                ("type", "Credit"),
                ("head", ",cardnumber,cardname"),
                ("body", "date,description,amount"),
                ("cardname", "VISA"),
            ]),
        )
        .expect("should build profile");

        assert_eq!(AccountType::Credit, profile.account_type);
        assert_eq!("cp932", profile.encoding);
        assert_eq!("", profile.cardnumber);
        assert_eq!("VISA", profile.cardname);
        assert_eq!(
            Some(",cardnumber,cardname".to_string()),
            profile.head.as_ref().map(ToString::to_string)
        );
        assert_eq!(encoding_rs::SHIFT_JIS, profile.csv_encoding().expect("encoding"));
    }

    #[test]
    fn head_absent_means_no_header_row() {
        let profile = Profile::from_resolved(
            "x",
            &section(&[("type", "bank"), ("body", "date,amount")]),
        )
        .expect("should build profile");
        assert_eq!(None, profile.head);
        assert_eq!(AccountType::Bank, profile.account_type);
    }

    #[test_case(&[("type", "loan"), ("body", "date,amount")] => ConfigError::InvalidValue {
        section: "x".to_string(),
        key: "type".to_string(),
        value: "loan".to_string(),
    } ; "bad_type")]
    #[test_case(&[("type", "credit")] => ConfigError::InvalidColumnLayout {
        section: "x".to_string(),
        key: "body".to_string(),
        reason: "no body layout defined".to_string(),
    } ; "missing_body")]
    #[test_case(&[("type", "credit"), ("head", "date"), ("body", "date,amount")] => ConfigError::InvalidColumnLayout {
        section: "x".to_string(),
        key: "head".to_string(),
        reason: "field date is not allowed in head".to_string(),
    } ; "bad_head")]
    fn bad_profile(pairs: &[(&str, &str)]) -> ConfigError {
        Profile::from_resolved("x", &section(pairs)).expect_err("expected an error")
    }

    #[test]
    fn unsupported_encoding_is_reported_on_lookup() {
        let profile = Profile::from_resolved(
            "x",
            &section(&[
                ("type", "credit"),
                ("body", "date,amount"),
                ("encoding", "klingon"),
            ]),
        )
        .expect("building the profile does not check the encoding");
        assert_eq!(
            Err(ConfigError::UnsupportedEncoding {
                section: "x".to_string(),
                key: "encoding".to_string(),
                label: "klingon".to_string(),
            }),
            profile.csv_encoding()
        );
    }

    #[test]
    fn display_round_trips_layouts() {
        let profile = Profile::from_resolved(
            "btmu",
            &section(&[
                ("type", "bank"),
                ("head", ""),
                ("body", "date,description,memo,-amount,+amount,,memo"),
                ("encoding", "cp932"),
                ("timezone", "JST-9"),
            ]),
        )
        .expect("should build profile");
        assert_eq!(
            "[btmu]\ntype=bank\nencoding=cp932\ntimezone=JST-9\nhead=\n\
             body=date,description,memo,-amount,+amount,,memo\ncardnumber=\ncardname=\n",
            profile.to_string()
        );
    }
}
