use ratesheet_core::quote::Quote;

pub fn format_quotes(quotes: &[Quote]) -> String {
    if quotes.is_empty() {
        return "No quotes extracted.".to_string();
    }

    let max_alias = quotes
        .iter()
        .map(|q| q.rate_class_alias.len())
        .max()
        .unwrap_or(10)
        .max("Rate class".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:>4}  {:>10}  {:>10}  {:>9}  {:<3}  {:<10}  {:<10}\n",
        "Rate class",
        "Term",
        "Vol min",
        "Vol limit",
        "Price",
        "POR",
        "Valid from",
        "Start",
        width = max_alias
    ));
    out.push_str(&"-".repeat(max_alias + 70));
    out.push('\n');

    for q in quotes {
        let limit = q
            .volume_limit
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<width$}  {:>4}  {:>10}  {:>10}  {:>9}  {:<3}  {:<10}  {:<10}\n",
            q.rate_class_alias,
            q.term_months,
            q.volume_min.to_string(),
            limit,
            q.price.to_string(),
            if q.purchase_of_receivables { "Y" } else { "N" },
            q.valid_from.to_string(),
            q.start_from.to_string(),
            width = max_alias
        ));
    }
    out.push_str(&format!("\n{} quote(s)", quotes.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_input_prints_a_notice() {
        assert_eq!(format_quotes(&[]), "No quotes extracted.");
    }

    #[test]
    fn rows_carry_the_quote_fields() {
        let day = NaiveDate::from_ymd_opt(2015, 5, 4).unwrap();
        let quote = Quote {
            start_from: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
            start_until: NaiveDate::from_ymd_opt(2015, 7, 1).unwrap(),
            term_months: 12,
            valid_from: day,
            valid_until: day + chrono::Duration::days(1),
            volume_min: dec!(0),
            volume_limit: None,
            rate_class_alias: "CT-CLP".into(),
            rate_class_ids: vec![Some(7)],
            purchase_of_receivables: true,
            price: dec!(0.0715),
            source_ref: None,
        };
        let table = format_quotes(&[quote]);
        assert!(table.contains("CT-CLP"));
        assert!(table.contains("0.0715"));
        assert!(table.contains("1 quote(s)"));
    }
}
