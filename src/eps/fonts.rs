//! Font name substitution
//!
//! Renderers embed whatever font name the figure asked for, which PostScript
//! interpreters without that font replace silently. Swapping to one of the 35
//! standard PostScript fonts keeps the metrics predictable.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::debug;

use super::{EpsError, Result};

/// A literal name such as `/Arial`
static NAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([^\s/\[\](){}<>%]+)").expect("valid regex"));

/// A DSC comment line such as `%%DocumentFonts: Arial Courier`
static DSC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^%%[^\r\n]*").expect("valid regex"));

static DSC_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\s:]+").expect("valid regex"));

/// The 35 standard PostScript Level 2 fonts
pub const STANDARD_FONTS: [&str; 35] = [
    "AvantGarde-Book",
    "AvantGarde-BookOblique",
    "AvantGarde-Demi",
    "AvantGarde-DemiOblique",
    "Bookman-Demi",
    "Bookman-DemiItalic",
    "Bookman-Light",
    "Bookman-LightItalic",
    "Courier",
    "Courier-Bold",
    "Courier-BoldOblique",
    "Courier-Oblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-BoldOblique",
    "Helvetica-Narrow",
    "Helvetica-Narrow-Bold",
    "Helvetica-Narrow-BoldOblique",
    "Helvetica-Narrow-Oblique",
    "Helvetica-Oblique",
    "NewCenturySchlbk-Bold",
    "NewCenturySchlbk-BoldItalic",
    "NewCenturySchlbk-Italic",
    "NewCenturySchlbk-Roman",
    "Palatino-Bold",
    "Palatino-BoldItalic",
    "Palatino-Italic",
    "Palatino-Roman",
    "Symbol",
    "Times-Bold",
    "Times-BoldItalic",
    "Times-Italic",
    "Times-Roman",
    "ZapfChancery-MediumItalic",
    "ZapfDingbats",
];

/// Family aliases: (normalized name, standard family, slant word, regular suffix)
const FAMILY_ALIASES: &[(&str, &str, &str, &str)] = &[
    ("helvetica", "Helvetica", "Oblique", ""),
    ("arial", "Helvetica", "Oblique", ""),
    ("liberationsans", "Helvetica", "Oblique", ""),
    ("nimbussans", "Helvetica", "Oblique", ""),
    ("sansserif", "Helvetica", "Oblique", ""),
    ("times", "Times", "Italic", "-Roman"),
    ("timesnewroman", "Times", "Italic", "-Roman"),
    ("liberationserif", "Times", "Italic", "-Roman"),
    ("nimbusroman", "Times", "Italic", "-Roman"),
    ("serif", "Times", "Italic", "-Roman"),
    ("courier", "Courier", "Oblique", ""),
    ("couriernew", "Courier", "Oblique", ""),
    ("liberationmono", "Courier", "Oblique", ""),
    ("nimbusmono", "Courier", "Oblique", ""),
    ("monospaced", "Courier", "Oblique", ""),
    ("palatino", "Palatino", "Italic", "-Roman"),
    ("palatinolinotype", "Palatino", "Italic", "-Roman"),
    ("bookantiqua", "Palatino", "Italic", "-Roman"),
    ("newcenturyschlbk", "NewCenturySchlbk", "Italic", "-Roman"),
    ("centuryschoolbook", "NewCenturySchlbk", "Italic", "-Roman"),
];

/// Style words stripped from a name before the family lookup
const STYLE_WORDS: [&str; 6] = ["bold", "italic", "oblique", "regular", "roman", "medium"];

/// Suggest the standard PostScript font closest to `name`
///
/// Known families (Arial, Times New Roman, Courier New, ...) map with their
/// bold/italic style preserved; anything else falls back to string similarity.
pub fn standard_font_for(name: &str) -> &'static str {
    if let Some(exact) = STANDARD_FONTS.iter().find(|f| f.eq_ignore_ascii_case(name)) {
        return *exact;
    }

    let lower = name.to_ascii_lowercase();
    let bold = lower.contains("bold");
    let slanted = lower.contains("italic") || lower.contains("oblique");

    let family_part = lower.split('-').next().unwrap_or(&lower);
    let mut key: String = family_part
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    for word in STYLE_WORDS {
        if key.len() > word.len() && key.ends_with(word) {
            key.truncate(key.len() - word.len());
        }
    }
    // "timesnewroman" loses its "roman" above; try both spellings
    let alias = FAMILY_ALIASES
        .iter()
        .find(|(alias, ..)| *alias == key || format!("{}roman", key) == *alias);

    if let Some(&(_, family, slant, regular)) = alias {
        let candidate = match (bold, slanted) {
            (false, false) => format!("{}{}", family, regular),
            (true, false) => format!("{}-Bold", family),
            (false, true) => format!("{}-{}", family, slant),
            (true, true) => format!("{}-Bold{}", family, slant),
        };
        if let Some(standard) = STANDARD_FONTS.iter().find(|f| **f == candidate) {
            return *standard;
        }
    }

    if key == "symbol" {
        return "Symbol";
    }

    STANDARD_FONTS
        .iter()
        .map(|f| (f, strsim::jaro_winkler(&lower, &f.to_ascii_lowercase())))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(f, _)| *f)
        .unwrap_or("Helvetica")
}

/// Font name substitution table
#[derive(Debug, Clone, Default)]
pub struct FontSwap {
    map: BTreeMap<String, String>,
}

impl FontSwap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a name map, rejecting names that are not valid PostScript names
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let mut swap = Self::new();
        for (from, to) in map {
            swap = swap.with(from, to)?;
        }
        Ok(swap)
    }

    /// Add a substitution
    pub fn with(mut self, from: &str, to: &str) -> Result<Self> {
        for name in [from, to] {
            if !is_valid_name(name) {
                return Err(EpsError::InvalidFontName(name.to_string()));
            }
        }
        if from != to {
            self.map.insert(from.to_string(), to.to_string());
        }
        Ok(self)
    }

    /// Map every font in `fonts` that is not standard to its closest standard font
    pub fn to_standard<'a, I>(fonts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let map = fonts
            .into_iter()
            .filter(|f| is_valid_name(f) && !STANDARD_FONTS.iter().any(|s| s == f))
            .map(|f| (f.to_string(), standard_font_for(f).to_string()))
            .collect();
        Self { map }
    }

    /// Add every substitution from `other`, overriding existing entries
    #[must_use]
    pub fn merge(mut self, other: &FontSwap) -> Self {
        self.map
            .extend(other.map.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Substitutions as a name map
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.map
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Apply all substitutions; returns the patched text and the replacement count
    ///
    /// Every name is looked up in the original text, so chained entries
    /// (A to B and B to C) do not cascade.
    pub fn apply(&self, text: &str) -> (String, usize) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        let patched = NAME_TOKEN
            .replace_all(text, |caps: &Captures| match self.map.get_key_value(&caps[1]) {
                Some((from, to)) => {
                    *counts.entry(from.as_str()).or_default() += 1;
                    format!("/{}", to)
                }
                None => caps[0].to_string(),
            })
            .into_owned();

        let patched = DSC_LINE
            .replace_all(&patched, |line: &Captures| {
                DSC_WORD
                    .replace_all(&line[0], |word: &Captures| {
                        match self.map.get_key_value(&word[0]) {
                            Some((from, to)) => {
                                *counts.entry(from.as_str()).or_default() += 1;
                                to.clone()
                            }
                            None => word[0].to_string(),
                        }
                    })
                    .into_owned()
            })
            .into_owned();

        for (from, count) in &counts {
            debug!(from = %from, to = %self.map[*from], count, "swapped font");
        }
        (patched, counts.values().sum())
    }

    /// Fonts referenced in a document's DSC font comments
    pub fn document_fonts(text: &str) -> Vec<String> {
        let mut fonts: Vec<String> = text
            .lines()
            .filter_map(|line| {
                line.strip_prefix("%%DocumentFonts:")
                    .or_else(|| line.strip_prefix("%%DocumentNeededFonts:"))
                    .or_else(|| line.strip_prefix("%%IncludeFont:"))
                    .or_else(|| line.strip_prefix("%%IncludeResource: font"))
            })
            .flat_map(|rest| rest.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|name| name != "(atend)")
            .collect();
        fonts.sort();
        fonts.dedup();
        fonts
    }
}

/// PostScript names cannot contain whitespace or delimiters
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !"/[](){}<>%".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_fonts_count() {
        assert_eq!(STANDARD_FONTS.len(), 35);
    }

    #[test]
    fn test_standard_font_exact() {
        assert_eq!(standard_font_for("Times-Italic"), "Times-Italic");
        assert_eq!(standard_font_for("helvetica-bold"), "Helvetica-Bold");
    }

    #[test]
    fn test_standard_font_aliases() {
        assert_eq!(standard_font_for("Arial"), "Helvetica");
        assert_eq!(standard_font_for("Arial-BoldItalic"), "Helvetica-BoldOblique");
        assert_eq!(standard_font_for("Times New Roman"), "Times-Roman");
        assert_eq!(standard_font_for("TimesNewRoman-Bold"), "Times-Bold");
        assert_eq!(standard_font_for("CourierNew-Italic"), "Courier-Oblique");
        assert_eq!(standard_font_for("Palatino"), "Palatino-Roman");
        assert_eq!(standard_font_for("Symbol"), "Symbol");
    }

    #[test]
    fn test_standard_font_fuzzy() {
        assert_eq!(standard_font_for("ZapfDingbat"), "ZapfDingbats");
        assert_eq!(standard_font_for("AvantGarde-Boo"), "AvantGarde-Book");
    }

    #[test]
    fn test_swap_name_references() {
        let swap = FontSwap::new().with("Arial", "Helvetica").unwrap();
        let text = "/Arial /WindowsLatin1Encoding 120 FMSR\n/Arial-Bold findfont\n/Arial\n";

        let (out, count) = swap.apply(text);
        assert_eq!(count, 2);
        assert!(out.contains("/Helvetica /WindowsLatin1Encoding 120 FMSR"));
        assert!(out.contains("/Arial-Bold findfont"));
        assert!(out.ends_with("/Helvetica\n"));
    }

    #[test]
    fn test_swap_dsc_comments() {
        let swap = FontSwap::new().with("Arial", "Helvetica").unwrap();
        let text = "%%DocumentFonts: Arial Courier\n%%IncludeResource: font Arial\n% Arial in a plain comment\n";

        let (out, count) = swap.apply(text);
        assert_eq!(count, 2);
        assert!(out.starts_with("%%DocumentFonts: Helvetica Courier\n"));
        assert!(out.contains("%%IncludeResource: font Helvetica\n"));
        assert!(out.contains("% Arial in a plain comment"));
    }

    #[test]
    fn test_swap_chained_entries_do_not_cascade() {
        let swap = FontSwap::new()
            .with("Arial", "Helvetica")
            .unwrap()
            .with("Helvetica", "Times-Roman")
            .unwrap();
        let text = "%%DocumentFonts: Arial Helvetica\n/Arial findfont\n/Helvetica findfont\n";

        let (out, count) = swap.apply(text);
        assert_eq!(count, 4);
        assert_eq!(
            out,
            "%%DocumentFonts: Helvetica Times-Roman\n/Helvetica findfont\n/Times-Roman findfont\n"
        );
    }

    #[test]
    fn test_swap_adjacent_names() {
        let swap = FontSwap::new().with("Arial", "Helvetica").unwrap();
        let (out, count) = swap.apply("/Arial/Arial[/Arial]");
        assert_eq!(count, 3);
        assert_eq!(out, "/Helvetica/Helvetica[/Helvetica]");
    }

    #[test]
    fn test_invalid_font_name() {
        let result = FontSwap::new().with("Times New Roman", "Times-Roman");
        assert!(matches!(result, Err(EpsError::InvalidFontName(_))));
    }

    #[test]
    fn test_identity_swap_ignored() {
        let swap = FontSwap::new().with("Helvetica", "Helvetica").unwrap();
        assert!(swap.is_empty());
    }

    #[test]
    fn test_to_standard() {
        let swap = FontSwap::to_standard(["Arial", "Helvetica", "Calibri"]);
        assert_eq!(swap.len(), 2);
        let (out, _) = swap.apply("/Arial findfont\n");
        assert_eq!(out, "/Helvetica findfont\n");
    }

    #[test]
    fn test_document_fonts() {
        let text = "%!PS\n%%DocumentFonts: (atend)\n%%Trailer\n%%DocumentFonts: Helvetica Arial\n%%IncludeResource: font Courier\n";
        assert_eq!(
            FontSwap::document_fonts(text),
            vec!["Arial".to_string(), "Courier".to_string(), "Helvetica".to_string()]
        );
    }

    #[test]
    fn test_merge_overrides() {
        let auto = FontSwap::to_standard(["Arial"]);
        let user = FontSwap::new().with("Arial", "Helvetica-Narrow").unwrap();

        let merged = auto.merge(&user);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.entries()["Arial"], "Helvetica-Narrow");
    }
}
