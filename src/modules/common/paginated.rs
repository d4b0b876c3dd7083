// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::cmp::min;

use serde::Serialize;

use crate::{
    modules::error::{code::ErrorCode, MailSyncResult},
    raise_error,
};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub total_items: u64,
    pub total_pages: Option<u64>,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(
        page: Option<u64>,
        page_size: Option<u64>,
        total_items: u64,
        total_pages: Option<u64>,
        items: Vec<T>,
    ) -> Self {
        Paginated {
            page,
            page_size,
            total_items,
            total_pages,
            items,
        }
    }
}

pub fn paginate_vec<T: Clone>(
    items: &[T],
    page: Option<u64>,
    page_size: Option<u64>,
) -> MailSyncResult<Paginated<T>> {
    let total_items = items.len() as u64;

    let (offset, total_pages) = match (page, page_size) {
        (Some(p), Some(s)) if p > 0 && s > 0 => {
            let offset = (p - 1).checked_mul(s).ok_or_else(|| {
                raise_error!(
                    format!("Page {} of size {} is out of range.", p, s),
                    ErrorCode::InvalidParameter
                )
            })?;
            let total_pages = total_items.div_ceil(s);
            (Some(offset), Some(total_pages))
        }
        (Some(0), _) | (_, Some(0)) => {
            return Err(raise_error!(
                "'page' and 'page_size' must be greater than 0.".into(),
                ErrorCode::InvalidParameter
            ));
        }
        _ => (None, None),
    };

    let data = match offset {
        Some(offset) if offset >= total_items => vec![],
        Some(offset) => {
            let end = min(
                offset.saturating_add(page_size.unwrap_or(total_items)),
                total_items,
            ) as usize;
            items[offset as usize..end].to_vec()
        }
        None => items.to_vec(),
    };

    Ok(Paginated::new(page, page_size, total_items, total_pages, data))
}
