//! Chart of accounts lookup and suspense fallback.

use std::collections::BTreeMap;

use tallybook_shared::LedgerConfig;
use tallybook_shared::types::AccountId;
use tracing::warn;

use super::kind::Module;

/// Read access to the chart of accounts.
pub trait ChartOfAccounts {
    /// Looks up an account by name.
    fn find(&self, name: &str) -> Option<AccountId>;

    /// The built-in suspense account; always resolvable.
    fn suspense(&self) -> AccountId;
}

/// Result of resolving a configured account name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    /// The account to post to.
    pub account: AccountId,
    /// True if the name did not resolve and suspense was used.
    pub fell_back: bool,
}

/// Resolves `name`, falling back to the suspense account.
///
/// Posting must always complete, so an unknown name is logged rather than
/// reported as an error.
pub fn resolve_or_default<C: ChartOfAccounts + ?Sized>(chart: &C, name: &str) -> ResolvedAccount {
    match chart.find(name) {
        Some(account) => ResolvedAccount {
            account,
            fell_back: false,
        },
        None => {
            warn!(account = name, "account not found, posting to suspense");
            ResolvedAccount {
                account: chart.suspense(),
                fell_back: true,
            }
        }
    }
}

/// The configured accounts a posting run needs, resolved once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemAccounts {
    /// VAT control account.
    pub vat: ResolvedAccount,
    /// Purchase ledger control account.
    pub purchase_control: ResolvedAccount,
    /// Sales ledger control account.
    pub sales_control: ResolvedAccount,
}

impl SystemAccounts {
    /// Resolves every configured name against `chart`.
    pub fn resolve<C: ChartOfAccounts + ?Sized>(chart: &C, config: &LedgerConfig) -> Self {
        Self {
            vat: resolve_or_default(chart, &config.vat_account),
            purchase_control: resolve_or_default(chart, &config.purchase_control_account),
            sales_control: resolve_or_default(chart, &config.sales_control_account),
        }
    }

    /// Control account of `module`; `None` for the cash book, which posts
    /// totals to the header's bank account.
    #[must_use]
    pub fn control(&self, module: Module) -> Option<AccountId> {
        match module {
            Module::Purchases => Some(self.purchase_control.account),
            Module::Sales => Some(self.sales_control.account),
            Module::CashBook => None,
        }
    }
}

/// In-memory chart of accounts keyed by name.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    by_name: BTreeMap<String, AccountId>,
    suspense: AccountId,
}

impl AccountDirectory {
    /// Creates a chart holding only the suspense account.
    #[must_use]
    pub fn new(suspense_name: &str) -> Self {
        let suspense = AccountId::new();
        let mut by_name = BTreeMap::new();
        by_name.insert(suspense_name.to_string(), suspense);
        Self { by_name, suspense }
    }

    /// Adds an account, returning its id. Re-adding a name returns the
    /// existing id.
    pub fn add(&mut self, name: &str) -> AccountId {
        *self
            .by_name
            .entry(name.to_string())
            .or_insert_with(AccountId::new)
    }

    /// Returns the name of an account.
    #[must_use]
    pub fn name_of(&self, id: AccountId) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, account)| **account == id)
            .map(|(name, _)| name.as_str())
    }
}

impl ChartOfAccounts for AccountDirectory {
    fn find(&self, name: &str) -> Option<AccountId> {
        self.by_name.get(name).copied()
    }

    fn suspense(&self) -> AccountId {
        self.suspense
    }
}
