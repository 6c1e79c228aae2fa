use regex::Regex;

/// A (year, month) reporting period recovered from a file name or a
/// workbook tab title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
}

fn month_from_name(name: &str) -> Option<u32> {
    match name.to_lowercase().trim_end_matches('.').trim() {
        "jan" | "january" => Some(1),
        "feb" | "february" => Some(2),
        "mar" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" => Some(5),
        "jun" | "june" => Some(6),
        "jul" | "july" => Some(7),
        "aug" | "august" => Some(8),
        "sep" | "sept" | "september" => Some(9),
        "oct" | "october" => Some(10),
        "nov" | "november" => Some(11),
        "dec" | "december" => Some(12),
        _ => None,
    }
}

/// Extract a period from a report file name like "Horizon_Sales_Sept_2024".
/// Year is the first `20xx` substring; month the first English month name,
/// full or abbreviated, optional trailing period. Either missing yields
/// `None`; callers skip the file rather than guess.
pub fn period_from_filename(name: &str) -> Option<ReportPeriod> {
    let year_re = Regex::new(r"(20\d{2})").unwrap();
    let month_re = Regex::new(
        r"(?i)(Jan\.?|Feb\.?|Mar\.?|Apr\.?|May\.?|Jun\.?|Jul\.?|Aug\.?|Sep\.?|Sept\.?|Oct\.?|Nov\.?|Dec\.?|January|February|March|April|May|June|July|August|September|October|November|December)",
    )
    .unwrap();

    let year = year_re.captures(name)?.get(1)?.as_str().parse().ok()?;
    let month = month_from_name(month_re.captures(name)?.get(1)?.as_str())?;
    Some(ReportPeriod { year, month })
}

/// Extract a period from a workbook tab titled like "March 2025".
pub fn period_from_sheet_name(name: &str) -> Option<ReportPeriod> {
    let re = Regex::new(r"([A-Za-z]+)\s+(20\d{2})").unwrap();
    let caps = re.captures(name)?;
    let month = month_from_name(caps.get(1)?.as_str())?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some(ReportPeriod { year, month })
}
