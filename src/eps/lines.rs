//! Line style fixes
//!
//! Renderer dash patterns are fixed lengths, so dots vanish on thick lines and
//! smear on thin ones. The rewritten definitions multiply every dash length by
//! the line width in force when the style is selected (never below 1pt).

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

static DASH_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^/(DO|DA|DD)\s*\{\s*\[[^\]]*\]\s*0\s+setdash\s*\}\s*bdef")
        .expect("valid regex")
});

static MITER_JOIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\s)0 LJ(\s|$)").expect("valid regex"));

static BUTT_CAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\s)0 LC(\s|$)").expect("valid regex"));

/// Dash lengths in line widths: dotted, dashed, dash-dot
const DOTTED: &[f64] = &[1.0, 3.0];
const DASHED: &[f64] = &[6.0, 3.0];
const DASH_DOT: &[f64] = &[6.0, 3.0, 1.0, 3.0];

/// Which line fixes to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFix {
    /// Scale dash patterns with the line width
    pub scale_dashes: bool,
    /// Replace miter joins with round joins
    pub round_joins: bool,
    /// Replace butt caps with round caps
    pub round_caps: bool,
}

impl Default for LineFix {
    fn default() -> Self {
        Self {
            scale_dashes: true,
            round_joins: true,
            round_caps: false,
        }
    }
}

impl LineFix {
    /// Every fix enabled
    pub fn all() -> Self {
        Self {
            scale_dashes: true,
            round_joins: true,
            round_caps: true,
        }
    }
}

fn dash_array(lengths: &[f64]) -> String {
    lengths
        .iter()
        .map(|len| format!("{} currentlinewidth 1 max mul", len))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Apply line fixes; returns the patched text and the number of substitutions
pub fn fix_line_styles(text: &str, fix: &LineFix) -> (String, usize) {
    let mut count = 0usize;
    let mut out = text.to_string();

    if fix.scale_dashes {
        out = DASH_DEF
            .replace_all(&out, |caps: &Captures| {
                count += 1;
                let lengths = match &caps[1] {
                    "DO" => DOTTED,
                    "DA" => DASHED,
                    _ => DASH_DOT,
                };
                format!("/{} {{ [{}] 0 setdash }} bdef", &caps[1], dash_array(lengths))
            })
            .into_owned();
    }

    if fix.round_joins {
        out = MITER_JOIN
            .replace_all(&out, |caps: &Captures| {
                count += 1;
                format!("{}1 LJ{}", &caps[1], &caps[2])
            })
            .into_owned();
    }

    if fix.round_caps {
        out = BUTT_CAP
            .replace_all(&out, |caps: &Captures| {
                count += 1;
                format!("{}1 LC{}", &caps[1], &caps[2])
            })
            .into_owned();
    }

    debug!(count, "fixed line styles");
    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROLOGUE: &str = "/SO { [] 0 setdash } bdef\n\
/DO { [.5 dpi2point mul 4 dpi2point mul] 0 setdash } bdef\n\
/DA { [6 dpi2point mul] 0 setdash } bdef\n\
/DD { [.5 dpi2point mul 4 dpi2point mul 6 dpi2point mul 4 dpi2point mul] 0 setdash } bdef\n\
0 LJ\n\
10.0 ML\n\
0 LC\n";

    #[test]
    fn test_scale_dashes() {
        let fix = LineFix {
            scale_dashes: true,
            round_joins: false,
            round_caps: false,
        };
        let (out, count) = fix_line_styles(PROLOGUE, &fix);

        assert_eq!(count, 3);
        assert!(out.contains("/SO { [] 0 setdash } bdef"));
        assert!(out.contains(
            "/DO { [1 currentlinewidth 1 max mul 3 currentlinewidth 1 max mul] 0 setdash } bdef"
        ));
        assert!(out.contains(
            "/DA { [6 currentlinewidth 1 max mul 3 currentlinewidth 1 max mul] 0 setdash } bdef"
        ));
        assert!(!out.contains("dpi2point"));
        assert!(out.contains("0 LJ"));
    }

    #[test]
    fn test_round_joins_and_caps() {
        let (out, count) = fix_line_styles(PROLOGUE, &LineFix::all());

        assert_eq!(count, 5);
        assert!(out.contains("\n1 LJ\n"));
        assert!(out.contains("\n1 LC\n"));
        assert!(out.contains("10.0 ML"));
    }

    #[test]
    fn test_no_matches() {
        let text = "newpath 0 0 moveto 10 10 lineto stroke\n";
        let (out, count) = fix_line_styles(text, &LineFix::all());
        assert_eq!(count, 0);
        assert_eq!(out, text);
    }

    #[test]
    fn test_join_token_boundaries() {
        let text = "10 LJ\n";
        let (out, count) = fix_line_styles(text, &LineFix::all());
        assert_eq!(count, 0);
        assert_eq!(out, text);
    }

    #[test]
    fn test_default_fix() {
        let fix = LineFix::default();
        assert!(fix.scale_dashes);
        assert!(fix.round_joins);
        assert!(!fix.round_caps);
    }
}
