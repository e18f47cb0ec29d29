//! Input preprocessing: FASTA-tolerant cleanup, composition counts, and
//! the validation gate the scanner runs before dispatch.

use crate::error::ScanError;

/// IUPAC nucleotide codes accepted on input. Ambiguous codes are valid
/// characters but never count toward GC/AT denominators.
const VALID_IUPAC: &[u8] = b"ATGCNRYKMSWBDHV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcBalance {
    GcRich,
    AtRich,
    Balanced,
}

impl GcBalance {
    pub fn as_str(&self) -> &'static str {
        match self {
            GcBalance::GcRich => "GC-rich",
            GcBalance::AtRich => "AT-rich",
            GcBalance::Balanced => "Balanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    Valid,
    Warning,
    Error,
}

/// Composition report for a raw input block (may include a FASTA header
/// and line breaks).
#[derive(Debug, Clone)]
pub struct PreprocessReport {
    pub header: String,
    pub sequence: String,
    pub length: usize,
    pub valid_bases: usize,
    pub a_count: usize,
    pub t_count: usize,
    pub g_count: usize,
    pub c_count: usize,
    pub n_count: usize,
    /// Invalid characters with up to ten 0-based positions each.
    pub invalid_characters: Vec<(char, Vec<usize>)>,
    pub gc_percentage: f64,
    pub at_percentage: f64,
    pub gc_balance: GcBalance,
    pub status: ValidationStatus,
    pub warnings: Vec<String>,
}

/// Uppercase, strip a leading FASTA header and line breaks, count
/// composition, and classify.
pub fn inspect(raw: &str) -> PreprocessReport {
    let normalized = raw.to_uppercase();
    let mut header = String::new();
    let mut sequence = String::new();
    for line in normalized.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix('>') {
            if header.is_empty() {
                header = rest.trim().to_string();
            }
        } else {
            sequence.push_str(line);
        }
    }

    let bytes = sequence.as_bytes();
    let (mut a, mut t, mut g, mut c, mut n) = (0, 0, 0, 0, 0);
    let mut invalid: Vec<(char, Vec<usize>)> = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'A' => a += 1,
            b'T' => t += 1,
            b'G' => g += 1,
            b'C' => c += 1,
            b'N' => n += 1,
            _ if VALID_IUPAC.contains(&b) => {}
            _ => {
                let ch = b as char;
                match invalid.iter_mut().find(|(x, _)| *x == ch) {
                    Some((_, positions)) => {
                        if positions.len() < 10 {
                            positions.push(i);
                        }
                    }
                    None => invalid.push((ch, vec![i])),
                }
            }
        }
    }

    let valid_bases = a + t + g + c;
    let (gc_percentage, at_percentage) = if valid_bases > 0 {
        (
            (g + c) as f64 / valid_bases as f64 * 100.0,
            (a + t) as f64 / valid_bases as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };
    let gc_balance = if gc_percentage > 60.0 {
        GcBalance::GcRich
    } else if gc_percentage < 40.0 {
        GcBalance::AtRich
    } else {
        GcBalance::Balanced
    };

    let mut warnings = Vec::new();
    let status = if !invalid.is_empty() {
        ValidationStatus::Error
    } else if sequence.is_empty() || valid_bases == 0 {
        warnings.push("no valid ATGC bases in sequence".to_string());
        ValidationStatus::Warning
    } else if n > 0 {
        warnings.push(format!(
            "sequence contains {n} ambiguous base(s) 'N' ({:.2}% of total length)",
            n as f64 / sequence.len() as f64 * 100.0
        ));
        ValidationStatus::Warning
    } else {
        ValidationStatus::Valid
    };

    PreprocessReport {
        header,
        length: sequence.len(),
        valid_bases,
        a_count: a,
        t_count: t,
        g_count: g,
        c_count: c,
        n_count: n,
        invalid_characters: invalid,
        gc_percentage,
        at_percentage,
        gc_balance,
        status,
        warnings,
        sequence,
    }
}

/// Validation gate used by the scanner: trim + uppercase, reject the
/// first non-IUPAC character.
pub fn validate(sequence: &str) -> Result<Vec<u8>, ScanError> {
    let trimmed = sequence.trim();
    let mut out = Vec::with_capacity(trimmed.len());
    for (i, ch) in trimmed.chars().enumerate() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii() || !VALID_IUPAC.contains(&(upper as u8)) {
            return Err(ScanError::InvalidCharacter { ch, pos: i });
        }
        out.push(upper as u8);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use float_eq::assert_float_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fasta_header_and_line_breaks_are_stripped() {
        let report = inspect(">chr1 test\nATGC\natgc\n");
        assert_eq!(report.header, "CHR1 TEST");
        assert_eq!(report.sequence, "ATGCATGC");
        assert_eq!(report.length, 8);
        assert_eq!(report.status, ValidationStatus::Valid);
    }

    #[test]
    fn gc_denominator_excludes_ambiguous() {
        let report = inspect("ATGCNNNN");
        assert_eq!(report.valid_bases, 4);
        assert_float_eq!(report.gc_percentage, 50.0, abs <= 1e-9);
        assert_eq!(report.status, ValidationStatus::Warning);
        assert_eq!(report.n_count, 4);
    }

    #[test]
    fn gc_agrees_with_the_shared_utility() {
        for seq in ["ATGCNNNN", "GGGCCC", "ATATAT", "GNCNAT"] {
            let report = inspect(seq);
            assert_float_eq!(
                report.gc_percentage,
                crate::seq_utils::gc_content(seq.as_bytes()),
                abs <= 1e-12
            );
        }
    }

    #[test]
    fn balance_classes() {
        assert_eq!(inspect("GGGGGGGGCC").gc_balance, GcBalance::GcRich);
        assert_eq!(inspect("AAAAATTTTTGC").gc_balance, GcBalance::AtRich);
        assert_eq!(inspect("ATGCATGC").gc_balance, GcBalance::Balanced);
    }

    #[test]
    fn invalid_characters_carry_positions() {
        let report = inspect("ATGXATGX");
        assert_eq!(report.status, ValidationStatus::Error);
        assert_eq!(report.invalid_characters.len(), 1);
        let (ch, positions) = &report.invalid_characters[0];
        assert_eq!(*ch, 'X');
        assert_eq!(positions, &vec![3, 7]);
    }

    #[test]
    fn validate_accepts_iupac_rejects_garbage() {
        assert_eq!(validate(" atgcn ").unwrap(), b"ATGCN".to_vec());
        assert!(matches!(
            validate("ATG-C"),
            Err(ScanError::InvalidCharacter { ch: '-', pos: 3 })
        ));
    }
}
