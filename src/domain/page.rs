//! Page-number pagination.

use crate::domain::error::PortfolioError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows across all pages.
    pub count: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u32 {
        let pages = self.count.div_ceil(u64::from(self.request.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Page 1 always exists, even when empty.
    pub fn is_out_of_range(&self) -> bool {
        self.request.page > self.last_page()
    }

    pub fn has_next(&self) -> bool {
        self.request.page < self.last_page()
    }

    pub fn has_previous(&self) -> bool {
        self.request.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            request: self.request,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl PaginationSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PortfolioError> {
        let page_size = config.get_int("pagination", "page_size", i64::from(DEFAULT_PAGE_SIZE));
        let max_page_size = config.get_int(
            "pagination",
            "max_page_size",
            i64::from(DEFAULT_MAX_PAGE_SIZE),
        );
        let page_size = positive(page_size, "page_size")?;
        let max_page_size = positive(max_page_size, "max_page_size")?;
        if page_size > max_page_size {
            return Err(PortfolioError::ConfigInvalid {
                section: "pagination".into(),
                key: "page_size".into(),
                reason: "page_size must not exceed max_page_size".into(),
            });
        }
        Ok(Self {
            page_size,
            max_page_size,
        })
    }

    /// Builds a request from optional query parameters, capping the size.
    pub fn request(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        let size = page_size
            .filter(|s| *s > 0)
            .unwrap_or(self.page_size)
            .min(self.max_page_size);
        PageRequest::new(page.unwrap_or(1), size)
    }
}

fn positive(value: i64, key: &str) -> Result<u32, PortfolioError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| PortfolioError::ConfigInvalid {
            section: "pagination".into(),
            key: key.into(),
            reason: format!("{key} must be a positive integer"),
        })
}
