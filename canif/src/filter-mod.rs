/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Filter specification grammar: "<header-hex>[<op><value-hex>]" with
 * <op> one of ':' (mask), '~' (mask inverted), '-' (range) and
 * '_' (range inverted). Without <op> a relaxed mask filter is built.
*/
use crate::frame::{CanFrame, HeaderFlags};
use crate::string::{header_from_string, hex_to_u32};
use crate::utils::CanError;
use std::sync::Arc;

/// Pure frame predicate, safe to evaluate from any thread.
pub trait CanFilter: Send + Sync {
    fn matches(&self, frame: &CanFrame) -> bool;
}

pub type CanFilterPtr = Arc<dyn CanFilter>;

/// Packets match when `fullid & mask == filter_id & mask`, optionally
/// inverted.
pub struct FrameMaskFilter {
    mask: u32,
    masked_id: u32,
    invert: bool,
}

impl FrameMaskFilter {
    /// every bit significant, flags included
    pub const MASK_ALL: u32 = u32::MAX;
    /// all identifier and extended bits, error and RTR flags ignored
    pub const MASK_RELAXED: u32 =
        !(HeaderFlags::ERR_FLAG.bits() | HeaderFlags::RTR_FLAG.bits());

    pub fn new(fullid: u32, mask: u32, invert: bool) -> Self {
        FrameMaskFilter { mask, masked_id: fullid & mask, invert }
    }

    /// relaxed match on one exact identifier
    pub fn exact(fullid: u32) -> Self {
        Self::new(fullid, Self::MASK_RELAXED, false)
    }
}

impl CanFilter for FrameMaskFilter {
    fn matches(&self, frame: &CanFrame) -> bool {
        ((frame.fullid() & self.mask) == self.masked_id) != self.invert
    }
}

/// Packets match when `min_id <= fullid <= max_id`, optionally inverted.
pub struct FrameRangeFilter {
    min_id: u32,
    max_id: u32,
    invert: bool,
}

impl FrameRangeFilter {
    pub fn new(min_id: u32, max_id: u32, invert: bool) -> Self {
        FrameRangeFilter { min_id, max_id, invert }
    }
}

impl CanFilter for FrameRangeFilter {
    fn matches(&self, frame: &CanFrame) -> bool {
        let fullid = frame.fullid();
        (self.min_id <= fullid && fullid <= self.max_id) != self.invert
    }
}

/// Ordered filter collection, matching when any member matches.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<CanFilterPtr>,
}

impl FilterChain {
    pub fn new() -> Self {
        FilterChain { filters: Vec::new() }
    }

    pub fn add(&mut self, filter: CanFilterPtr) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn add_mask(&mut self, fullid: u32, mask: u32) -> &mut Self {
        self.add(Arc::new(FrameMaskFilter::new(fullid, mask, false)))
    }

    pub fn add_range(&mut self, min_id: u32, max_id: u32) -> &mut Self {
        self.add(Arc::new(FrameRangeFilter::new(min_id, max_id, false)))
    }

    /// Add a filter parsed from its specification string.
    ///
    /// # Errors
    /// Returns `CanError` when the specification does not parse.
    pub fn add_spec(&mut self, spec: &str) -> Result<&mut Self, CanError> {
        let filter = filter_from_spec(spec)?;
        Ok(self.add(filter))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl CanFilter for FilterChain {
    fn matches(&self, frame: &CanFrame) -> bool {
        self.filters.iter().any(|filter| filter.matches(frame))
    }
}

/// Build a filter from its specification string.
///
/// # Errors
/// Returns `CanError` for an empty specification; a plain header text
/// builds a relaxed mask filter.
pub fn filter_from_spec(spec: &str) -> Result<CanFilterPtr, CanError> {
    if spec.is_empty() {
        return Err(CanError::new("filter-empty-spec", "filter specification is empty"));
    }

    let filter: CanFilterPtr = match spec.find([':', '~', '-', '_']) {
        None => {
            let first = header_from_string(spec).fullid();
            Arc::new(FrameMaskFilter::new(first, FrameMaskFilter::MASK_RELAXED, false))
        }
        Some(delim) => {
            let first = header_from_string(&spec[..delim]).fullid();
            let second = hex_to_u32(&spec[delim + 1..]);
            match spec.as_bytes()[delim] {
                b':' => Arc::new(FrameMaskFilter::new(first, second, false)),
                b'~' => Arc::new(FrameMaskFilter::new(first, second, true)),
                b'-' => Arc::new(FrameRangeFilter::new(first, second, false)),
                // only '_' remains, find() yields no other delimiter
                _ => Arc::new(FrameRangeFilter::new(first, second, true)),
            }
        }
    };
    Ok(filter)
}

/// Numeric construction: relaxed mask filter on one exact fullid.
pub fn filter_from_id(fullid: u32) -> CanFilterPtr {
    Arc::new(FrameMaskFilter::exact(fullid))
}
