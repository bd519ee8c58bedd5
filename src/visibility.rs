use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

use crate::domain::MdvError;

/// Read side of the visibility settings store. `Ok(None)` means no rule row
/// exists for the key, which is a normal outcome, not an error; `Err` is a
/// genuine transport/permission failure.
pub trait VisibilityStore {
    fn hidden_columns(&self, role: &str, tab: &str) -> Result<Option<Vec<String>>, MdvError>;
    fn hidden_tabs(&self, role: &str) -> Result<Option<Vec<String>>, MdvError>;
}

/// Resolves per-role column and tab visibility, memoized per (role, tab)
/// for the lifetime of the session. Fails open: no rule means everything is
/// visible, and a store error logs and resolves to visible as well, rather
/// than silently hiding data.
pub struct VisibilityResolver {
    store: Box<dyn VisibilityStore>,
    role: String,
    columns: RefCell<HashMap<String, HashSet<String>>>,
    tabs: RefCell<Option<HashSet<String>>>,
}

impl VisibilityResolver {
    pub fn new(store: Box<dyn VisibilityStore>, role: &str) -> Self {
        Self {
            store,
            role: role.to_string(),
            columns: RefCell::new(HashMap::new()),
            tabs: RefCell::new(None),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Switching role invalidates every memoized rule.
    pub fn set_role(&mut self, role: &str) {
        if self.role != role {
            self.role = role.to_string();
            self.columns.borrow_mut().clear();
            *self.tabs.borrow_mut() = None;
        }
    }

    fn hidden_columns_for(&self, tab: &str) -> HashSet<String> {
        if let Some(hidden) = self.columns.borrow().get(tab) {
            return hidden.clone();
        }
        let hidden: HashSet<String> = match self.store.hidden_columns(&self.role, tab) {
            Ok(Some(columns)) => {
                debug!(
                    "Hiding {} columns for role {} on tab {}",
                    columns.len(),
                    self.role,
                    tab
                );
                columns.into_iter().collect()
            }
            Ok(None) => HashSet::new(),
            Err(e) => {
                error!("Column visibility lookup failed, failing open: {e}");
                HashSet::new()
            }
        };
        self.columns
            .borrow_mut()
            .insert(tab.to_string(), hidden.clone());
        hidden
    }

    fn hidden_tabs(&self) -> HashSet<String> {
        if let Some(hidden) = self.tabs.borrow().as_ref() {
            return hidden.clone();
        }
        let hidden: HashSet<String> = match self.store.hidden_tabs(&self.role) {
            Ok(Some(tabs)) => tabs.into_iter().collect(),
            Ok(None) => HashSet::new(),
            Err(e) => {
                error!("Tab visibility lookup failed, failing open: {e}");
                HashSet::new()
            }
        };
        *self.tabs.borrow_mut() = Some(hidden.clone());
        hidden
    }

    pub fn is_column_visible(&self, tab: &str, column: &str) -> bool {
        !self.hidden_columns_for(tab).contains(column)
    }

    pub fn is_tab_visible(&self, tab: &str) -> bool {
        !self.hidden_tabs().contains(tab)
    }

    /// Restricts a header set to the visible columns, keeping header order.
    pub fn visible_columns(&self, tab: &str, headers: &[String]) -> Vec<String> {
        let hidden = self.hidden_columns_for(tab);
        headers
            .iter()
            .filter(|column| !hidden.contains(*column))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeStore {
        rule: Option<Vec<String>>,
        fail: bool,
        lookups: Rc<Cell<usize>>,
    }

    impl VisibilityStore for FakeStore {
        fn hidden_columns(&self, _role: &str, _tab: &str) -> Result<Option<Vec<String>>, MdvError> {
            self.lookups.set(self.lookups.get() + 1);
            if self.fail {
                return Err(MdvError::FetchFailed("store down".to_string()));
            }
            Ok(self.rule.clone())
        }

        fn hidden_tabs(&self, _role: &str) -> Result<Option<Vec<String>>, MdvError> {
            if self.fail {
                return Err(MdvError::FetchFailed("store down".to_string()));
            }
            Ok(self.rule.clone())
        }
    }

    fn resolver(rule: Option<Vec<String>>, fail: bool) -> (VisibilityResolver, Rc<Cell<usize>>) {
        let lookups = Rc::new(Cell::new(0));
        let store = FakeStore {
            rule,
            fail,
            lookups: Rc::clone(&lookups),
        };
        (VisibilityResolver::new(Box::new(store), "viewer"), lookups)
    }

    #[test]
    fn no_rule_means_everything_visible() {
        let (resolver, _) = resolver(None, false);
        assert!(resolver.is_column_visible("market_lines", "Revenue"));
        assert!(resolver.is_column_visible("market_lines", "anything"));
        assert!(resolver.is_tab_visible("DE"));
    }

    #[test]
    fn rule_hides_exactly_its_set() {
        let (resolver, _) = resolver(Some(vec!["Revenue".to_string()]), false);
        assert!(!resolver.is_column_visible("market_lines", "Revenue"));
        assert!(resolver.is_column_visible("market_lines", "SSP"));
        assert!(!resolver.is_tab_visible("Revenue"));
    }

    #[test]
    fn store_error_fails_open() {
        let (resolver, _) = resolver(None, true);
        assert!(resolver.is_column_visible("market_lines", "Revenue"));
        assert!(resolver.is_tab_visible("DE"));
    }

    #[test]
    fn lookups_are_memoized_per_tab() {
        let (resolver, lookups) = resolver(Some(vec!["Revenue".to_string()]), false);
        resolver.is_column_visible("market_lines", "Revenue");
        resolver.is_column_visible("market_lines", "SSP");
        assert_eq!(lookups.get(), 1);
        resolver.is_column_visible("library", "SSP");
        assert_eq!(lookups.get(), 2);
    }

    #[test]
    fn role_change_re_resolves() {
        let (mut resolver, lookups) = resolver(Some(vec!["Revenue".to_string()]), false);
        resolver.is_column_visible("market_lines", "Revenue");
        resolver.set_role("admin");
        resolver.is_column_visible("market_lines", "Revenue");
        assert_eq!(lookups.get(), 2);
    }

    #[test]
    fn visible_columns_keeps_header_order() {
        let (resolver, _) = resolver(Some(vec!["b".to_string()]), false);
        let headers: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolver.visible_columns("t", &headers), vec!["a", "c"]);
    }
}
