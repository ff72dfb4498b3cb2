use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};

use super::{slot_conflict, ScheduleStore, TimeWindow};
use crate::models::AvailabilitySlot;

/// Resolves the slot for `window` and marks it booked.
///
/// With an explicit `slot_id` the slot must belong to the mentor, cover
/// exactly `window` and be free. Without one, the unique row for the window
/// is claimed, creating it on first use. Callers run the overlap check first,
/// so a booked row on this path is held only by a session that no longer
/// blocks the window and is taken over from it.
pub(crate) fn claim_slot(
    store: &mut dyn ScheduleStore,
    mentor_id: Uuid,
    window: &TimeWindow,
    slot_id: Option<Uuid>,
) -> AppResult<AvailabilitySlot> {
    let slot = match slot_id {
        Some(id) => {
            let slot = store
                .slot(id)?
                .filter(|s| s.mentor_id == mentor_id)
                .ok_or_else(|| AppError::new(ErrorCode::SlotNotFound, "slot not found"))?;
            if !window.matches(slot.start_ts, slot.end_ts) {
                return Err(AppError::new(
                    ErrorCode::InvalidTimeWindow,
                    "requested time does not match the slot",
                ));
            }
            if slot.is_booked {
                return Err(slot_conflict());
            }
            slot
        }
        None => {
            let slot = store.upsert_slot(mentor_id, window)?;
            if slot.is_booked {
                tracing::debug!(slot_id = %slot.id, "taking over slot from a non-blocking session");
                store.detach_slot(slot.id)?;
            }
            slot
        }
    };

    store.set_slot_booked(slot.id, true)?;
    Ok(AvailabilitySlot { is_booked: true, ..slot })
}

/// Marks the slot free again. Freeing a free slot is a no-op.
pub(crate) fn release_slot(store: &mut dyn ScheduleStore, slot_id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = slot_id {
        store.set_slot_booked(id, false)?;
    }
    Ok(())
}
