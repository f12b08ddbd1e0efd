pub mod trade;
pub mod tradebook;
pub mod user;

use serde::Deserialize;

/// Page/limit query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    /// Clamp to sane bounds (page >= 1, 1 <= limit <= 100) and convert to a
    /// LIMIT/OFFSET window.
    pub fn window(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1) as i64;
        let limit = self.limit.unwrap_or(20).clamp(1, 100) as i64;
        (limit, (page - 1) * limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::default().window(), (20, 0));
        assert_eq!(
            Pagination { page: Some(3), limit: Some(10) }.window(),
            (10, 20)
        );
        // Hard limit of 100 items per page
        assert_eq!(
            Pagination { page: Some(0), limit: Some(1000) }.window(),
            (100, 0)
        );
    }
}
