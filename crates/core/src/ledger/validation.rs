//! Business rule validation for ledger operations.

use rust_decimal::Decimal;
use tallybook_shared::types::HeaderId;

use super::error::{LedgerError, Violation};
use super::posting::PostingStrategy;
use super::types::{Header, Line, Posting};

/// Checks a header and its final set of lines against the line rules.
///
/// Returns every violation found; an empty vector means the header is valid.
#[must_use]
pub fn validate_transaction(header: &Header, lines: &[Line]) -> Vec<Violation> {
    let class = header.kind.classify();
    let strategy = PostingStrategy::for_kind(header.kind);
    let mut violations = Vec::new();

    if class.requires_lines {
        if lines.is_empty() {
            violations.push(Violation::NoLines);
        }
    } else if !lines.is_empty() {
        violations.push(Violation::LinesNotAllowed { kind: header.kind });
    }

    for line in lines {
        if line.is_zero() {
            violations.push(Violation::ZeroLine {
                line_no: line.line_no,
            });
        }
        if strategy.has_vat() && !line.goods.is_zero() && line.account.is_none() {
            violations.push(Violation::MissingAccount {
                line_no: line.line_no,
            });
        }
    }

    if strategy.uses_bank() && header.bank_account.is_none() {
        violations.push(Violation::MissingBankAccount);
    }

    violations
}

/// Validates that a header's postings sum to zero.
///
/// # Errors
///
/// Returns `LedgerError::UnbalancedPostings` with the offending sum.
pub fn validate_balance(header: HeaderId, postings: &[Posting]) -> Result<(), LedgerError> {
    let sum: Decimal = postings.iter().map(|p| p.value).sum();
    if sum.is_zero() {
        Ok(())
    } else {
        Err(LedgerError::UnbalancedPostings { header, sum })
    }
}
