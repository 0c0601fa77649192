//! Page envelope returned by [`Repository::page`](crate::Repository::page).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pager<T> {
    pub current_page: u64,
    pub page_size: u64,
    pub total: u64,
    /// `ceil(total / page_size)`, never below 1
    pub last_page: u64,
    pub data: Vec<T>,
}

impl<T> Pager<T> {
    pub fn new(current_page: u64, page_size: u64, total: u64, data: Vec<T>) -> Self {
        Self {
            current_page,
            page_size,
            total,
            last_page: last_page(total, page_size),
            data,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Pager<U> {
        Pager {
            current_page: self.current_page,
            page_size: self.page_size,
            total: self.total,
            last_page: self.last_page,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

pub fn last_page(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_rounds_up() {
        assert_eq!(last_page(25, 10), 3);
        assert_eq!(last_page(30, 10), 3);
        assert_eq!(last_page(1, 10), 1);
    }

    #[test]
    fn test_last_page_never_zero() {
        assert_eq!(last_page(0, 10), 1);
        assert_eq!(last_page(5, 0), 1);
    }

    #[test]
    fn test_serializes_envelope() {
        let pager = Pager::new(2, 10, 25, vec![1, 2]);
        assert!(pager.has_next());
        let json = serde_json::to_value(&pager).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "current_page": 2,
                "page_size": 10,
                "total": 25,
                "last_page": 3,
                "data": [1, 2]
            })
        );
    }
}
