//! Writes a `Journal` as an OFX 1.02 (SGML) statement.

use std::fmt;

use chrono::Offset;

use crate::conf::AccountType;
use crate::journal::{Journal, Transaction};
use crate::tz::ZonedDateTime;

const HEADER: &str = "\
OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:UTF-8
CHARSET:CSUNICODE
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE

";

const CURRENCY: &str = "JPY";
const LANGUAGE: &str = "JPN";

/// Formats a journal as OFX when displayed.
pub struct Ofx<'a> {
    journal: &'a Journal,
    /// Upper-case transaction names.
    upper: bool,
}

impl<'a> Ofx<'a> {
    pub fn new(journal: &'a Journal, upper: bool) -> Self {
        Self { journal, upper }
    }
}

/// Element names that differ between card and bank statements.
struct Aggregates {
    msgsrs: &'static str,
    trnrs: &'static str,
    stmtrs: &'static str,
    acctfrom: &'static str,
}

impl Aggregates {
    fn for_account(account_type: AccountType) -> Self {
        match account_type {
            AccountType::Credit => Self {
                msgsrs: "CREDITCARDMSGSRSV1",
                trnrs: "CCSTMTTRNRS",
                stmtrs: "CCSTMTRS",
                acctfrom: "CCACCTFROM",
            },
            AccountType::Bank => Self {
                msgsrs: "BANKMSGSRSV1",
                trnrs: "STMTTRNRS",
                stmtrs: "STMTRS",
                acctfrom: "BANKACCTFROM",
            },
        }
    }
}

impl<'a> fmt::Display for Ofx<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let journal = self.journal;
        let agg = Aggregates::for_account(journal.account_type);
        let (first, last) = journal
            .date_range()
            .unwrap_or((&journal.generated, &journal.generated));

        f.write_str(HEADER)?;
        writeln!(f, "<OFX>")?;
        writeln!(f, " <SIGNONMSGSRSV1>")?;
        writeln!(f, "  <SONRS>")?;
        write_status(f, "   ")?;
        writeln!(f, "   <DTSERVER>{}", OfxDateTime(&journal.generated))?;
        writeln!(f, "   <LANGUAGE>{}", LANGUAGE)?;
        writeln!(f, "   <FI>")?;
        writeln!(f, "    <ORG>{}", Escaped(&journal.cardname))?;
        writeln!(f, "   </FI>")?;
        writeln!(f, "  </SONRS>")?;
        writeln!(f, " </SIGNONMSGSRSV1>")?;
        writeln!(f, " <{}>", agg.msgsrs)?;
        writeln!(f, "  <{}>", agg.trnrs)?;
        writeln!(f, "   <TRNUID>0")?;
        write_status(f, "   ")?;
        writeln!(f, "   <{}>", agg.stmtrs)?;
        writeln!(f, "    <CURDEF>{}", CURRENCY)?;
        writeln!(f, "    <{}>", agg.acctfrom)?;
        if journal.account_type == AccountType::Bank {
            writeln!(f, "     <BANKID>{}", Escaped(&journal.cardname))?;
        }
        writeln!(f, "     <ACCTID>{}", Escaped(&journal.cardnumber))?;
        if journal.account_type == AccountType::Bank {
            writeln!(f, "     <ACCTTYPE>CHECKING")?;
        }
        writeln!(f, "    </{}>", agg.acctfrom)?;
        writeln!(f, "    <BANKTRANLIST>")?;
        writeln!(f, "     <DTSTART>{}", OfxDateTime(first))?;
        writeln!(f, "     <DTEND>{}", OfxDateTime(last))?;

        let mut transactions: Vec<&Transaction> = journal
            .transactions
            .iter()
            .filter(|t| !t.amount.is_zero())
            .collect();
        transactions.sort_by_key(|t| t.fitid);
        for trn in transactions {
            self.write_transaction(f, trn)?;
        }

        writeln!(f, "    </BANKTRANLIST>")?;
        writeln!(f, "    <LEDGERBAL>")?;
        writeln!(f, "     <BALAMT>{}", journal.total())?;
        writeln!(f, "    </LEDGERBAL>")?;
        writeln!(f, "   </{}>", agg.stmtrs)?;
        writeln!(f, "  </{}>", agg.trnrs)?;
        writeln!(f, " </{}>", agg.msgsrs)?;
        writeln!(f, "</OFX>")
    }
}

impl<'a> Ofx<'a> {
    fn write_transaction(&self, f: &mut fmt::Formatter, trn: &Transaction) -> fmt::Result {
        let trntype = if trn.amount.is_sign_negative() {
            "DEBIT"
        } else {
            "CREDIT"
        };
        let name = if self.upper {
            trn.description.to_uppercase()
        } else {
            trn.description.clone()
        };
        writeln!(f, "     <STMTTRN>")?;
        writeln!(f, "      <TRNTYPE>{}", trntype)?;
        writeln!(f, "      <DTPOSTED>{}", OfxDateTime(&trn.posted))?;
        writeln!(f, "      <TRNAMT>{}", trn.amount.abs())?;
        writeln!(f, "      <FITID>{}", trn.fitid)?;
        writeln!(f, "      <NAME>{}", Escaped(&name))?;
        writeln!(f, "      <MEMO>{}", Escaped(&trn.memo))?;
        writeln!(f, "     </STMTTRN>")
    }
}

fn write_status(f: &mut fmt::Formatter, indent: &str) -> fmt::Result {
    writeln!(f, "{}<STATUS>", indent)?;
    writeln!(f, "{} <CODE>0", indent)?;
    writeln!(f, "{} <SEVERITY>INFO", indent)?;
    writeln!(f, "{}</STATUS>", indent)
}

/// `YYYYMMDDHHMMSS[+H.HH:NAME]`
struct OfxDateTime<'a>(&'a ZonedDateTime);

impl<'a> fmt::Display for OfxDateTime<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dt = &self.0.datetime;
        let hours = f64::from(dt.offset().fix().local_minus_utc()) / 3600.0;
        write!(
            f,
            "{}[{:+.2}:{}]",
            dt.format("%Y%m%d%H%M%S"),
            hours,
            self.0.zone
        )
    }
}

/// Escapes the characters that would otherwise start SGML markup.
struct Escaped<'a>(&'a str);

impl<'a> fmt::Display for Escaped<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                c => fmt::Write::write_char(f, c)?,
            }
        }
        Ok(())
    }
}
