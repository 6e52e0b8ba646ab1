//! Pagination arithmetic

/// Resolved window of a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl Pagination {
    /// `skip` defaults to `(page - 1) * limit` when the caller gave none (or 0)
    pub fn resolve(page: Option<u64>, limit: Option<u64>, skip: Option<u64>, default_limit: u64) -> Self {
        let limit = limit.unwrap_or(default_limit).max(1);
        let page = page.unwrap_or(1).max(1);
        let skip = match skip {
            Some(skip) if skip >= 1 => skip,
            _ => (page - 1).saturating_mul(limit),
        };
        Self { page, limit, skip }
    }

    /// `ceil(total / limit)`
    pub fn last_page(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_from_page() {
        let p = Pagination::resolve(Some(3), Some(20), None, 10);
        assert_eq!(p.skip, 40);
        let p = Pagination::resolve(Some(3), Some(20), Some(0), 10);
        assert_eq!(p.skip, 40);
    }

    #[test]
    fn test_explicit_skip_wins() {
        let p = Pagination::resolve(Some(3), Some(20), Some(5), 10);
        assert_eq!(p.skip, 5);
    }

    #[test]
    fn test_defaults() {
        let p = Pagination::resolve(None, None, None, 10);
        assert_eq!(p, Pagination { page: 1, limit: 10, skip: 0 });
        let p = Pagination::resolve(Some(0), Some(0), None, 10);
        assert_eq!(p, Pagination { page: 1, limit: 1, skip: 0 });
    }

    #[test]
    fn test_last_page() {
        let p = Pagination::resolve(None, Some(10), None, 10);
        assert_eq!(p.last_page(0), 0);
        assert_eq!(p.last_page(10), 1);
        assert_eq!(p.last_page(11), 2);
    }
}
