//! Column layouts of the `head` and `body` keys.

use std::fmt;

use itertools::Itertools;

use crate::conf::error::ConfigError;

/// A named CSV column.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    Date,
    Description,
    /// Single signed amount column.
    Amount,
    /// `-amount`: money out, negated when combined.
    Debit,
    /// `+amount`: money in.
    Credit,
    Memo,
    Commission,
    CardNumber,
    CardName,
}

impl Field {
    pub fn token(self) -> &'static str {
        use Field::*;
        match self {
            Date => "date",
            Description => "description",
            Amount => "amount",
            Debit => "-amount",
            Credit => "+amount",
            Memo => "memo",
            Commission => "commission",
            CardNumber => "cardnumber",
            CardName => "cardname",
        }
    }

    fn from_token(s: &str) -> Option<Self> {
        use Field::*;
        Some(match s {
            "date" => Date,
            "description" => Description,
            "amount" => Amount,
            "-amount" => Debit,
            "+amount" => Credit,
            "memo" => Memo,
            "commission" => Commission,
            "cardnumber" => CardNumber,
            "cardname" => CardName,
            _ => return None,
        })
    }

    fn allowed_in(self, kind: Kind) -> bool {
        use Field::*;
        match kind {
            Kind::Head => matches!(self, CardNumber | CardName),
            Kind::Body => !matches!(self, CardNumber | CardName),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Head,
    Body,
}

impl Kind {
    fn key(self) -> &'static str {
        match self {
            Kind::Head => "head",
            Kind::Body => "body",
        }
    }
}

/// Where the signed amount of a row comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AmountColumns {
    Single(usize),
    /// At least one of the two is present.
    Split {
        debit: Option<usize>,
        credit: Option<usize>,
    },
}

/// Ordered columns of a CSV row. `None` marks an ignored column.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Layout {
    columns: Vec<Option<Field>>,
}

impl Layout {
    /// Parses a `head` value. An empty value yields a single ignored column,
    /// meaning the header line is skipped.
    pub fn parse_head(section: &str, value: &str) -> Result<Self, ConfigError> {
        let layout = Self::parse(section, value, Kind::Head)?;
        layout.check_unique(section, Kind::Head, &[Field::CardNumber, Field::CardName])?;
        Ok(layout)
    }

    pub fn parse_body(section: &str, value: &str) -> Result<Self, ConfigError> {
        let layout = Self::parse(section, value, Kind::Body)?;
        layout.check_unique(
            section,
            Kind::Body,
            &[Field::Date, Field::Description, Field::Commission],
        )?;
        layout.check_amounts(section)?;
        if !layout.contains(Field::Date) {
            return Err(ConfigError::invalid_layout(section, "body", "no date column"));
        }
        Ok(layout)
    }

    fn parse(section: &str, value: &str, kind: Kind) -> Result<Self, ConfigError> {
        let columns = value
            .split(',')
            .map(str::trim)
            .map(|token| {
                if token.is_empty() {
                    return Ok(None);
                }
                let field = Field::from_token(&token.to_lowercase()).ok_or_else(|| {
                    ConfigError::invalid_layout(
                        section,
                        kind.key(),
                        format!("unknown field {:?}", token),
                    )
                })?;
                if !field.allowed_in(kind) {
                    return Err(ConfigError::invalid_layout(
                        section,
                        kind.key(),
                        format!("field {} is not allowed in {}", field, kind.key()),
                    ));
                }
                Ok(Some(field))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { columns })
    }

    fn check_unique(&self, section: &str, kind: Kind, fields: &[Field]) -> Result<(), ConfigError> {
        for field in fields {
            if self.positions(*field).count() > 1 {
                return Err(ConfigError::invalid_layout(
                    section,
                    kind.key(),
                    format!("{} appears more than once", field),
                ));
            }
        }
        Ok(())
    }

    fn check_amounts(&self, section: &str) -> Result<(), ConfigError> {
        let single = self.positions(Field::Amount).count();
        let debit = self.positions(Field::Debit).count();
        let credit = self.positions(Field::Credit).count();

        let reason = if single > 0 && debit + credit > 0 {
            "amount cannot be combined with -amount/+amount"
        } else if single > 1 {
            "amount appears more than once"
        } else if debit > 1 || credit > 1 {
            "at most one -amount/+amount pair is allowed"
        } else if single + debit + credit == 0 {
            "no amount column"
        } else {
            return Ok(());
        };
        Err(ConfigError::invalid_layout(section, "body", reason))
    }

    pub fn columns(&self) -> &[Option<Field>] {
        &self.columns
    }

    /// Indices of every column holding `field`, in column order.
    pub fn positions(&self, field: Field) -> impl Iterator<Item = usize> + '_ {
        self.columns
            .iter()
            .positions(move |column| *column == Some(field))
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions(field).next()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.position(field).is_some()
    }

    /// Only meaningful for a validated body layout.
    pub fn amount_columns(&self) -> Option<AmountColumns> {
        if let Some(idx) = self.position(Field::Amount) {
            return Some(AmountColumns::Single(idx));
        }
        let debit = self.position(Field::Debit);
        let credit = self.position(Field::Credit);
        if debit.is_none() && credit.is_none() {
            return None;
        }
        Some(AmountColumns::Split { debit, credit })
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tokens = self
            .columns()
            .iter()
            .map(|column| column.map(Field::token).unwrap_or(""))
            .join(",");
        f.write_str(&tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    use Field::*;

    #[test]
    fn body_with_ignored_columns() {
        let layout = Layout::parse_body("visa", "date,description,amount,,,commission,memo")
            .expect("should parse");
        assert_eq!(
            &[
                Some(Date),
                Some(Description),
                Some(Amount),
                None,
                None,
                Some(Commission),
                Some(Memo)
            ],
            layout.columns()
        );
        assert_eq!(Some(AmountColumns::Single(2)), layout.amount_columns());
        assert_eq!(
            "date,description,amount,,,commission,memo",
            layout.to_string()
        );
    }

    #[test]
    fn body_with_split_amounts_and_many_memos() {
        let layout = Layout::parse_body("btmu", " date , memo,-amount,+amount, , memo,Memo")
            .expect("should parse");
        assert_eq!(
            Some(AmountColumns::Split {
                debit: Some(2),
                credit: Some(3)
            }),
            layout.amount_columns()
        );
        assert_eq!(vec![1, 5, 6], layout.positions(Memo).collect::<Vec<_>>());
    }

    #[test]
    fn body_with_debit_only() {
        let layout = Layout::parse_body("x", "date,description,-amount").expect("should parse");
        assert_eq!(
            Some(AmountColumns::Split {
                debit: Some(2),
                credit: None
            }),
            layout.amount_columns()
        );
    }

    #[test]
    fn empty_head_skips_one_line() {
        let layout = Layout::parse_head("btmu", "").expect("should parse");
        assert_eq!(&[None], layout.columns());
        assert_eq!("", layout.to_string());
    }

    #[test]
    fn head_with_card_fields() {
        let layout = Layout::parse_head("visa", ",cardnumber,cardname").expect("should parse");
        assert_eq!(Some(1), layout.position(CardNumber));
        assert_eq!(Some(2), layout.position(CardName));
    }

    #[test_case("date,amount,-amount", "cannot be combined" ; "amount_with_debit")]
    #[test_case("date,+amount,amount", "cannot be combined" ; "amount_with_credit")]
    #[test_case("date,-amount,+amount,-amount,+amount", "at most one" ; "two_signed_pairs")]
    #[test_case("date,-amount,-amount", "at most one" ; "two_debits")]
    #[test_case("date,amount,amount", "amount appears more than once" ; "two_amounts")]
    #[test_case("date,description,description,amount", "description appears more than once" ; "two_descriptions")]
    #[test_case("date,description,memo", "no amount column" ; "no_amount")]
    #[test_case("description,amount", "no date column" ; "no_date")]
    #[test_case("date,amount,balance", "unknown field \"balance\"" ; "unknown_field")]
    #[test_case("date,amount,cardnumber", "not allowed in body" ; "head_field_in_body")]
    fn bad_body(value: &str, want_err_containing: &str) {
        match Layout::parse_body("sec", value) {
            Ok(layout) => panic!("expected an error, got {:?}", layout),
            Err(e) => {
                assert!(
                    matches!(e, ConfigError::InvalidColumnLayout { ref section, ref key, .. }
                        if section == "sec" && key == "body"),
                    "got error: {:?}",
                    e
                );
                let msg = format!("{}", e);
                assert!(msg.contains(want_err_containing), "got error: {}", msg);
            }
        }
    }

    #[test_case(",cardnumber,date", "not allowed in head" ; "body_field_in_head")]
    #[test_case("cardname,cardname", "cardname appears more than once" ; "two_cardnames")]
    fn bad_head(value: &str, want_err_containing: &str) {
        match Layout::parse_head("sec", value) {
            Ok(layout) => panic!("expected an error, got {:?}", layout),
            Err(e) => {
                let msg = format!("{}", e);
                assert!(msg.contains(want_err_containing), "got error: {}", msg);
            }
        }
    }
}
