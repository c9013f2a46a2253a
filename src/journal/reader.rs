//! Reads CSV exports according to an issuer profile.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::amazon::{AmazonJournal, AMAZON_DESCRIPTION};
use crate::conf::{AccountType, AmountColumns, Field, Profile};
use crate::journal::{Journal, Transaction};
use crate::subst::SubstTable;
use crate::text;
use crate::tz::Timezone;

/// Issuer whose exports pack several CR-separated lines into the first line.
const CR_HEADER_ISSUER: &str = "btmucc";

/// Rows without a parseable date inherit the previous row's date, starting
/// from this one.
fn initial_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

/// Marks rows of notes rather than transactions in exports with a commission
/// column.
const NOTE_MARK: char = '※';

const MEMO_SEPARATOR: &str = ",";

pub struct ReadOptions<'a> {
    pub timezone: &'a Timezone,
    pub amazon: Option<&'a AmazonJournal>,
    pub subst: Option<&'a SubstTable>,
}

pub fn read_path(profile: &Profile, path: &Path, opts: &ReadOptions) -> Result<Journal> {
    let encoding = profile.csv_encoding()?;
    let mut reader = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .strip_bom(true)
        .build(File::open(path).with_context(|| format!("opening {:?} for reading", path))?);
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .with_context(|| format!("decoding {:?} as {}", path, encoding.name()))?;
    read_str(profile, &content, opts).with_context(|| format!("reading {:?}", path))
}

pub fn read_str(profile: &Profile, content: &str, opts: &ReadOptions) -> Result<Journal> {
    let content = if profile.issuer.eq_ignore_ascii_case(CR_HEADER_ISSUER) {
        Cow::Owned(keep_last_header_subline(content))
    } else {
        Cow::Borrowed(content)
    };

    let mut csv_rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut csv_records = csv_rdr.records();

    let mut cardnumber = profile.cardnumber.clone();
    let mut cardname = profile.cardname.clone();
    if let Some(head) = &profile.head {
        let header = csv_records
            .next()
            .ok_or_else(|| anyhow!("missing header line"))?
            .context("reading header line")?;
        let header = Row {
            record: &header,
            line: 1,
        };
        if let Some(idx) = head.position(Field::CardNumber) {
            override_nonempty(&mut cardnumber, header.cell(idx)?);
        }
        if let Some(idx) = head.position(Field::CardName) {
            override_nonempty(&mut cardname, header.cell(idx)?);
        }
    }

    let row_reader = RowReader::new(profile, opts)?;
    let mut transactions = Vec::new();
    for (fitid, result) in csv_records.enumerate() {
        let record = result.context("reading CSV record")?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fitid + 1);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = Row {
            record: &record,
            line,
        };
        if let Some(trn) = row_reader
            .read(&row, fitid)
            .with_context(|| format!("line {}", line))?
        {
            transactions.push(trn);
        }
    }

    Ok(Journal {
        account_type: profile.account_type,
        cardnumber,
        cardname,
        generated: opts.timezone.now(),
        transactions,
    })
}

fn override_nonempty(value: &mut String, cell: &str) {
    let cell = text::normalize(cell);
    if !cell.is_empty() {
        *value = cell;
    }
}

/// Keeps only the last of the CR-separated sub-lines of the first line.
fn keep_last_header_subline(content: &str) -> String {
    let end = content
        .find("\r\n")
        .or_else(|| content.find('\n'))
        .unwrap_or(content.len());
    let (first, rest) = content.split_at(end);
    let last = first.trim_end().rsplit('\r').next().unwrap_or_default();
    format!("{}{}", last, rest)
}

struct Row<'r> {
    record: &'r csv::StringRecord,
    line: usize,
}

impl<'r> Row<'r> {
    fn cell(&self, idx: usize) -> Result<&'r str> {
        self.record.get(idx).ok_or_else(|| {
            anyhow!(
                "line {} has {} columns, column {} is missing",
                self.line,
                self.record.len(),
                idx + 1
            )
        })
    }

    fn text(&self, idx: usize) -> Result<String> {
        Ok(text::collapse_spaces(&text::normalize(self.cell(idx)?)))
    }

    fn amount(&self, idx: usize) -> Result<Decimal> {
        text::parse_amount(self.cell(idx)?)
    }
}

/// Column positions of a profile's body, resolved once per file.
struct RowReader<'a> {
    opts: &'a ReadOptions<'a>,
    account_type: AccountType,
    date: usize,
    description: Option<usize>,
    amount: AmountColumns,
    memos: Vec<usize>,
    commission: Option<usize>,
    prev_date: std::cell::Cell<NaiveDate>,
}

impl<'a> RowReader<'a> {
    fn new(profile: &Profile, opts: &'a ReadOptions<'a>) -> Result<Self> {
        let body = &profile.body;
        Ok(Self {
            opts,
            account_type: profile.account_type,
            date: body
                .position(Field::Date)
                .ok_or_else(|| anyhow!("[{}] body has no date column", profile.issuer))?,
            description: body.position(Field::Description),
            amount: body
                .amount_columns()
                .ok_or_else(|| anyhow!("[{}] body has no amount column", profile.issuer))?,
            memos: body.positions(Field::Memo).collect(),
            commission: body.position(Field::Commission),
            prev_date: std::cell::Cell::new(initial_date()),
        })
    }

    /// Returns `None` for rows that are notes rather than transactions.
    fn read(&self, row: &Row, fitid: usize) -> Result<Option<Transaction>> {
        let date_cell = row.cell(self.date)?;
        let date = match text::parse_date(date_cell) {
            Some(date) => date,
            None => {
                let prev = self.prev_date.get();
                debug!(line = row.line, value = date_cell, %prev, "unparseable date, using the previous row's");
                prev
            }
        };

        let description = match self.description {
            Some(idx) => row.text(idx)?,
            None => String::new(),
        };
        let mut amount = self.amount(row)?;
        let mut memo = self
            .memos
            .iter()
            .map(|idx| row.text(*idx))
            .collect::<Result<Vec<String>>>()?
            .join(MEMO_SEPARATOR);

        if let Some(amazon) = self.opts.amazon {
            if description == AMAZON_DESCRIPTION {
                let found = amazon.search(date, -amount);
                match found.as_slice() {
                    [(order_id, items)] => {
                        debug!(line = row.line, order_id = order_id.as_str(), "matched Amazon order");
                        memo = items.clone();
                    }
                    _ => warn!(
                        line = row.line,
                        %date,
                        amount = %(-amount),
                        found = found.len(),
                        "multiple or no Amazon card charges found"
                    ),
                }
            }
        }

        if let Some(subst) = self.opts.subst {
            memo = subst.apply(&memo);
        }

        // Drop the description duplicated at the start of the memo.
        if let Some(rest) = memo
            .strip_prefix(description.as_str())
            .and_then(|rest| rest.strip_prefix(MEMO_SEPARATOR))
        {
            memo = rest.to_string();
        }

        if let Some(idx) = self.commission {
            if description.is_empty() || description.starts_with(NOTE_MARK) {
                return Ok(None);
            }
            if amount.is_zero() {
                amount = -row.amount(idx)?;
            }
        }

        self.prev_date.set(date);
        Ok(Some(Transaction {
            fitid,
            posted: self.opts.timezone.start_of_day(date)?,
            description,
            amount,
            memo,
        }))
    }

    fn amount(&self, row: &Row) -> Result<Decimal> {
        Ok(match self.amount {
            AmountColumns::Single(idx) => {
                let value = row.amount(idx)?;
                match self.account_type {
                    // Card exports list charges as positive values.
                    AccountType::Credit => -value,
                    AccountType::Bank => value,
                }
            }
            AmountColumns::Split { debit, credit } => {
                let debit = debit.map(|idx| row.amount(idx)).transpose()?;
                let credit = credit.map(|idx| row.amount(idx)).transpose()?;
                credit.unwrap_or_default() - debit.unwrap_or_default()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::conf::Config;
    use crate::testutil::assert_text_eq;

    fn profile(issuer: &str) -> Profile {
        Config::parse(include_str!("../../testdata/csv2ofx.ini"))
            .expect("config should parse")
            .profile(issuer)
            .expect("profile should resolve")
    }

    fn jst() -> Timezone {
        "JST-9".parse().expect("valid timezone")
    }

    fn read(issuer: &str, content: &str, opts: &ReadOptions) -> Journal {
        read_str(&profile(issuer), &textwrap::dedent(content), opts).expect("should read")
    }

    /// `(fitid, date, description, amount, memo)` of each transaction.
    fn summary(journal: &Journal) -> Vec<(usize, String, String, Decimal, String)> {
        journal
            .transactions
            .iter()
            .map(|t| {
                (
                    t.fitid,
                    t.posted.datetime.format("%Y-%m-%d").to_string(),
                    t.description.clone(),
                    t.amount,
                    t.memo.clone(),
                )
            })
            .collect()
    }

    fn row(
        fitid: usize,
        date: &str,
        description: &str,
        amount: i64,
        memo: &str,
    ) -> (usize, String, String, Decimal, String) {
        (
            fitid,
            date.to_string(),
            description.to_string(),
            Decimal::new(amount, 0),
            memo.to_string(),
        )
    }

    #[test]
    fn card_with_header_and_commission() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let journal = read(
            "visa",
            r#"
            ,1234-****-****-5678,ＶＩＳＡ Gold
            2024/01/05,Coffee  Shop,450,,,,"Coffee Shop,latte"
            ,※ご利用明細,,,,,
            2024/01/07,Transfer fee,,,,200,
            ,Annual fee,"1,000",,,,
            "#,
            &opts,
        );

        assert_eq!(AccountType::Credit, journal.account_type);
        assert_eq!("1234-****-****-5678", journal.cardnumber);
        assert_eq!("VISA Gold", journal.cardname);
        assert_eq!(
            vec![
                row(0, "2024-01-05", "Coffee Shop", -450, "latte"),
                row(2, "2024-01-07", "Transfer fee", -200, ""),
                row(3, "2024-01-07", "Annual fee", -1000, ""),
            ],
            summary(&journal)
        );
        assert_eq!(
            tz.start_of_day(NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid date"))
                .expect("valid time"),
            journal.transactions[0].posted
        );
    }

    #[test]
    fn bank_skips_header_line() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let journal = read(
            "btmu",
            r#"
            日付,摘要,摘要内容,支払金額,預かり金額,差引残高,メモ
            2024/01/04,給与,振込,,"250,000",,ﾒﾓ
            2024-01-25,家賃,,"80,000",,,
            "#,
            &opts,
        );

        assert_eq!(AccountType::Bank, journal.account_type);
        assert_eq!("0123456", journal.cardnumber);
        assert_eq!("BTMU", journal.cardname);
        assert_eq!(
            vec![
                row(0, "2024-01-04", "給与", 250000, "振込,メモ"),
                row(1, "2024-01-25", "家賃", -80000, ","),
            ],
            summary(&journal)
        );
    }

    #[test]
    fn btmucc_keeps_last_header_subline() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let content = "ご利用明細\r2024年2月\r,9999-****,BTMU VISA\r\n2024/02/01,Shop,100,,,,\r\n";
        let journal = read_str(&profile("btmucc"), content, &opts).expect("should read");

        assert_eq!("9999-****", journal.cardnumber);
        assert_eq!("BTMU VISA", journal.cardname);
        assert_eq!(vec![row(0, "2024-02-01", "Shop", -100, "")], summary(&journal));
    }

    #[test]
    fn empty_header_cells_keep_configured_values() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let journal = read("btmucc", ",,\n2024/02/01,Shop,100,,,,\n", &opts);
        assert_eq!("", journal.cardnumber);
        assert_eq!("BTMU Card", journal.cardname);
    }

    #[test]
    fn amazon_and_substitution() {
        let tz = jst();
        let amazon = AmazonJournal::from_reader(
            textwrap::dedent(
                "
                注文番号,注文日,商品名,付帯情報,価格,個数,商品小計,クレカ請求日,クレカ請求額,クレカ種類
                A-1,2024/01/03,Book,,1000,1,1000,,,
                A-1,2024/01/03,（クレジットカードへの請求）,,,,,2024/01/05,1000,Visa
                ",
            )
            .trim_start()
            .as_bytes(),
        )
        .expect("history should parse");
        let subst = SubstTable::parse("Book=本\n");
        let opts = ReadOptions {
            timezone: &tz,
            amazon: Some(&amazon),
            subst: Some(&subst),
        };
        let journal = read(
            "jcb",
            r#"
            2024/01/05,ＡＭＡＺＯＮ．ＣＯ．ＪＰ,,,,1000,x,y
            2024/01/20,AMAZON.CO.JP,,,,999,Book,z
            "#,
            &opts,
        );

        assert_eq!("XXXX-XXXX-XXXX-1234", journal.cardnumber);
        assert_eq!(
            vec![
                row(0, "2024-01-05", "AMAZON.CO.JP", -1000, "本"),
                row(1, "2024-01-20", "AMAZON.CO.JP", -999, "本,z"),
            ],
            summary(&journal)
        );
    }

    #[test]
    fn missing_column() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let e = read_str(&profile("jcb"), "2024/01/05,short\n", &opts)
            .expect_err("expected an error");
        let msg = format!("{:#}", e);
        assert!(msg.contains("column 6 is missing"), "got error: {}", msg);
    }

    #[test]
    fn missing_header() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let e = read_str(&profile("visa"), "", &opts).expect_err("expected an error");
        assert!(format!("{}", e).contains("missing header line"), "got error: {}", e);
    }

    #[test]
    fn drops_memo_prefix_only_before_separator() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let journal = read("jcb", "2024/01/05,Shop,,,,10,Shopping,\n", &opts);
        assert_eq!("Shopping,", journal.transactions[0].memo);
    }

    fn inline_profile(text: &str, issuer: &str) -> Profile {
        Config::parse(&textwrap::dedent(text))
            .expect("config should parse")
            .profile(issuer)
            .expect("profile should resolve")
    }

    /// One `fitid date description amount memo` line per transaction.
    fn format_transactions(journal: &Journal) -> String {
        journal
            .transactions
            .iter()
            .map(|t| {
                format!(
                    "{} {} {:?} {} {:?}\n",
                    t.fitid,
                    t.posted.datetime.format("%Y-%m-%d"),
                    t.description,
                    t.amount,
                    t.memo
                )
            })
            .collect()
    }

    #[test]
    fn single_sided_split_amounts() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let config = r#"
            [debit]
            body=date,description,-amount
            [credit]
            type=bank
            body=date,description,+amount
            "#;
        let content = "2024/01/01,a,100\n2024/01/02,b,\"1,250\"\n";

        let debit = read_str(&inline_profile(config, "debit"), content, &opts).expect("should read");
        assert_text_eq(
            concat!(
                "0 2024-01-01 \"a\" -100 \"\"\n",
                "1 2024-01-02 \"b\" -1250 \"\"\n",
            ),
            &format_transactions(&debit),
        );

        let credit =
            read_str(&inline_profile(config, "credit"), content, &opts).expect("should read");
        assert_text_eq(
            concat!(
                "0 2024-01-01 \"a\" 100 \"\"\n",
                "1 2024-01-02 \"b\" 1250 \"\"\n",
            ),
            &format_transactions(&credit),
        );
    }

    #[test]
    fn commission_rows_without_description_are_dropped() {
        let tz = jst();
        let opts = ReadOptions {
            timezone: &tz,
            amazon: None,
            subst: None,
        };
        let profile = inline_profile(
            r#"
            [fees]
            body=date,description,amount,commission
            "#,
            "fees",
        );
        let journal = read_str(
            &profile,
            "2024/01/01,,100,\n2024/01/02,b,0,30\n2024/01/03,c,40,5\n",
            &opts,
        )
        .expect("should read");
        assert_text_eq(
            concat!(
                "1 2024-01-02 \"b\" -30 \"\"\n",
                "2 2024-01-03 \"c\" -40 \"\"\n",
            ),
            &format_transactions(&journal),
        );
    }
}
