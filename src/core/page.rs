/// The page a store call originates from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    pub id: i64,
    pub namespace: i64,
    /// Prefixed name, e.g. "Help:Contents"
    pub name: String,
    /// Title without namespace prefix, e.g. "Contents"
    pub title: String,
}

impl PageIdentity {
    #[must_use]
    pub fn new(id: i64, namespace: i64, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            namespace,
            name: name.into(),
            title: title.into(),
        }
    }

    /// Page in the main namespace, where name and title coincide
    #[must_use]
    pub fn main(id: i64, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id,
            namespace: 0,
            name: title.clone(),
            title,
        }
    }
}

/// Where a store call comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreOrigin {
    /// A regular page save: every table on the page receives data
    #[default]
    PageSave,
    /// Bulk repopulation of one table: store calls for other tables are skipped
    BatchRecreate(String),
}

/// Explicit per-call context passed into `StorageEngine::store`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreContext {
    pub origin: StoreOrigin,
}

impl StoreContext {
    #[must_use]
    pub fn page_save() -> Self {
        Self {
            origin: StoreOrigin::PageSave,
        }
    }

    #[must_use]
    pub fn batch_recreate(table_name: impl Into<String>) -> Self {
        Self {
            origin: StoreOrigin::BatchRecreate(table_name.into()),
        }
    }

    /// Whether a store call for `table_name` should run under this context
    #[must_use]
    pub fn accepts(&self, table_name: &str) -> bool {
        match &self.origin {
            StoreOrigin::PageSave => true,
            StoreOrigin::BatchRecreate(target) => target == table_name,
        }
    }
}
