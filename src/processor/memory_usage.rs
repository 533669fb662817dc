//! Userspace (libc wrapper) and kernel (page allocator) memory handlers.
//!
//! Both turn allocation events into signed per-thread memory differences.

use super::{building, field, EventHandler, EventInterest};
use crate::data_model::{MemoryUsageBuilder, MemoryUsageDataModel, ModelSlot};
use crate::parser::{Event, EventMetadata, Handle};
use crate::utils::config::{kmem, ust_libc, PAGE_SIZE};
use crate::utils::error::{FieldError, ProcessError};
use std::collections::HashMap;

const UST_EVENTS: &[&str] = &[
    ust_libc::MALLOC,
    ust_libc::CALLOC,
    ust_libc::REALLOC,
    ust_libc::FREE,
    ust_libc::MEMALIGN,
    ust_libc::POSIX_MEMALIGN,
];
const UST_REQUIRED: &[&str] = &[ust_libc::MALLOC, ust_libc::FREE];

const KERNEL_EVENTS: &[&str] = &[kmem::PAGE_ALLOC, kmem::PAGE_FREE];

/// Tracks libc allocations through the `lttng_ust_libc` wrapper events
///
/// Keeps the size allocated at each live pointer so that frees subtract
/// exactly what was allocated.
#[derive(Debug, Default)]
pub struct UserspaceMemoryUsageHandler {
    slot: ModelSlot<MemoryUsageBuilder>,
    // pointer -> allocated size
    allocations: HashMap<Handle, i64>,
}

impl UserspaceMemoryUsageHandler {
    pub const NAME: &'static str = "ust_memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&MemoryUsageDataModel> {
        self.slot.model()
    }

    pub fn into_data(self) -> Option<MemoryUsageDataModel> {
        self.slot.into_model()
    }

    /// Signed difference for a pointer getting `size` bytes (0 = freed)
    fn update(&mut self, ptr: Handle, size: i64) -> i64 {
        if size != 0 {
            self.allocations.insert(ptr, size);
            size
        } else {
            self.allocations.remove(&ptr).map(|s| -s).unwrap_or(0)
        }
    }
}

impl EventHandler for UserspaceMemoryUsageHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interest(&self) -> EventInterest {
        EventInterest::Only(UST_EVENTS)
    }

    fn required_events(&self) -> &'static [&'static str] {
        UST_REQUIRED
    }

    fn handle(&mut self, event: &Event, metadata: &EventMetadata) -> Result<(), ProcessError> {
        building(&mut self.slot, Self::NAME)?;
        let tid = field(event, metadata.require_tid())?;
        let ptr = |name: &str| field(event, event.get_handle(name));
        let int = |name: &str| field(event, event.get_int(name));

        // (pointer, size) changes; a zero size frees the pointer
        let changes: Vec<(Handle, i64)> = match event.name.as_str() {
            ust_libc::MALLOC | ust_libc::MEMALIGN => vec![(ptr("ptr")?, int("size")?)],
            ust_libc::CALLOC => vec![(ptr("ptr")?, int("nmemb")?.saturating_mul(int("size")?))],
            ust_libc::REALLOC => vec![(ptr("in_ptr")?, 0), (ptr("ptr")?, int("size")?)],
            ust_libc::FREE => vec![(ptr("ptr")?, 0)],
            ust_libc::POSIX_MEMALIGN => vec![(ptr("out_ptr")?, int("size")?)],
            _ => Vec::new(),
        };

        for (pointer, size) in changes {
            // Null pointers are failed allocations or no-op frees
            if pointer == 0 {
                continue;
            }
            let diff = self.update(pointer, size);
            building(&mut self.slot, Self::NAME)?.add_memory_difference(event.timestamp, tid, diff);
        }
        Ok(())
    }

    fn finalize(&mut self) {
        self.slot.finalize();
        self.allocations.clear();
    }

    fn discard(&mut self) {
        self.slot.discard();
        self.allocations.clear();
    }

    fn is_finalized(&self) -> bool {
        self.slot.is_finalized()
    }
}

/// Tracks kernel page allocations (`PAGE_SIZE << order` bytes per event)
#[derive(Debug, Default)]
pub struct KernelMemoryUsageHandler {
    slot: ModelSlot<MemoryUsageBuilder>,
}

impl KernelMemoryUsageHandler {
    pub const NAME: &'static str = "kernel_memory";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&MemoryUsageDataModel> {
        self.slot.model()
    }

    pub fn into_data(self) -> Option<MemoryUsageDataModel> {
        self.slot.into_model()
    }
}

impl EventHandler for KernelMemoryUsageHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interest(&self) -> EventInterest {
        EventInterest::Only(KERNEL_EVENTS)
    }

    fn required_events(&self) -> &'static [&'static str] {
        KERNEL_EVENTS
    }

    fn handle(&mut self, event: &Event, metadata: &EventMetadata) -> Result<(), ProcessError> {
        let data = building(&mut self.slot, Self::NAME)?;
        let tid = field(event, metadata.require_tid())?;
        let order = field(event, event.get_u64("order"))?;
        let bytes = u32::try_from(order)
            .ok()
            .and_then(|o| PAGE_SIZE.checked_shl(o))
            .filter(|b| *b > 0)
            .ok_or_else(|| FieldError::TypeMismatch {
                field: "order".to_string(),
                expected: "page order",
            });
        let bytes = field(event, bytes)?;

        let diff = if event.name == kmem::PAGE_FREE { -bytes } else { bytes };
        data.add_memory_difference(event.timestamp, tid, diff);
        Ok(())
    }

    fn finalize(&mut self) {
        self.slot.finalize();
    }

    fn discard(&mut self) {
        self.slot.discard();
    }

    fn is_finalized(&self) -> bool {
        self.slot.is_finalized()
    }
}
