mod common;

use common::Arena;
use kernel_frames::{FRAME_SIZE, PhysicalAddress};
use kernel_pmm::{FrameAllocator, FrameError, InitError, POISON_BYTE};
use std::collections::HashSet;

#[test]
fn allocate_release_round_trip_is_lifo() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();
    let total = pmm.frame_count();
    assert_eq!(pmm.free_frames(), total);

    let frame = pmm.allocate().expect("pool was just seeded");
    // Seeding pushes frames in ascending order, so the most recently freed
    // (highest) frame comes back first.
    assert_eq!(frame, pmm.region().frame_at(total - 1));
    assert_eq!(pmm.ref_count(frame), Some(1));
    assert_eq!(pmm.free_frames(), total - 1);

    pmm.release(frame);
    assert_eq!(pmm.ref_count(frame), Some(0));
    assert_eq!(pmm.free_frames(), total);

    // the frame just freed is handed out again first
    assert_eq!(pmm.allocate(), Some(frame));
}

#[test]
fn sharing_defers_pooling_until_the_last_owner() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();
    let total = pmm.frame_count();

    let frame = pmm.allocate().expect("pool was just seeded");
    assert_eq!(pmm.add_reference(frame), Ok(2));
    assert_eq!(pmm.add_reference(frame), Ok(3));

    // a direct release on a shared frame decrements without pooling
    pmm.release(frame);
    assert_eq!(pmm.ref_count(frame), Some(2));
    assert_eq!(pmm.free_frames(), total - 1);

    assert_eq!(pmm.remove_reference(frame), Ok(1));
    assert_eq!(pmm.free_frames(), total - 1);

    // last owner departs; the frame is physically freed
    assert_eq!(pmm.remove_reference(frame), Ok(0));
    assert_eq!(pmm.ref_count(frame), Some(0));
    assert_eq!(pmm.free_frames(), total);
    assert_eq!(pmm.allocate(), Some(frame));
}

#[test]
fn exhaustion_is_a_normal_empty_result() {
    let mut arena = Arena::new(16);
    let pmm = arena.allocator();
    let total = pmm.frame_count();

    let mut seen = HashSet::new();
    for _ in 0..total {
        let frame = pmm.allocate().expect("pool must hold frame_count frames");
        assert!(seen.insert(frame.as_u64()), "frame handed out twice");
    }
    assert_eq!(pmm.allocate(), None);
    assert_eq!(pmm.free_frames(), 0);

    for &raw in &seen {
        pmm.release(PhysicalAddress::new(raw));
    }
    assert_eq!(pmm.free_frames(), total);
}

#[test]
fn reclaimed_frames_are_poisoned() {
    let mut arena = Arena::new(4);
    let pmm = arena.allocator();

    let frame = pmm.allocate().expect("pool was just seeded");
    unsafe {
        std::ptr::write_bytes(frame.as_mut_ptr::<u8>(), 0x11, FRAME_SIZE as usize);
    }

    pmm.release(frame);
    let bytes =
        unsafe { std::slice::from_raw_parts(frame.as_ptr::<u8>(), FRAME_SIZE as usize) };
    // the first word of a pooled frame holds the free-list link
    let link = std::mem::size_of::<usize>();
    assert!(bytes[link..].iter().all(|&b| b == POISON_BYTE));
}

#[test]
fn boundary_rejection() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();
    let base = pmm.region().base();
    let end = pmm.region().end();

    // one byte below the range: fails alignment first
    let below_byte = PhysicalAddress::new(base.as_u64() - 1);
    assert_eq!(pmm.try_release(below_byte), Err(FrameError::Unaligned(below_byte)));

    // one frame below the range (inside the carved table): aligned but unmanaged
    let below_frame = PhysicalAddress::new(base.as_u64() - FRAME_SIZE);
    assert_eq!(
        pmm.try_release(below_frame),
        Err(FrameError::Unmanaged(below_frame))
    );

    // first address past the end
    assert_eq!(pmm.try_release(end), Err(FrameError::Unmanaged(end)));

    // unaligned interior address
    let odd = base + 1;
    assert_eq!(pmm.try_release(odd), Err(FrameError::Unaligned(odd)));
}

#[test]
#[should_panic(expected = "release:")]
fn release_halts_on_an_unmanaged_address() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();
    let end = pmm.region().end();
    pmm.release(end);
}

#[test]
fn over_decrement_is_reported() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();

    let frame = pmm.allocate().expect("pool was just seeded");
    assert_eq!(pmm.remove_reference(frame), Ok(0));
    assert_eq!(
        pmm.remove_reference(frame),
        Err(FrameError::Unreferenced(frame))
    );

    let outside = PhysicalAddress::new(pmm.region().end().as_u64() + FRAME_SIZE);
    assert_eq!(
        pmm.add_reference(outside),
        Err(FrameError::Unmanaged(outside))
    );
    assert_eq!(
        pmm.remove_reference(outside),
        Err(FrameError::Unmanaged(outside))
    );
}

#[test]
fn frame_index_maps_managed_addresses_only() {
    let mut arena = Arena::new(8);
    let pmm = arena.allocator();
    let base = pmm.region().base();

    assert_eq!(pmm.frame_index(base), Some(0));
    assert_eq!(pmm.frame_index(base + FRAME_SIZE + 123), Some(1));
    assert_eq!(pmm.frame_index(PhysicalAddress::new(base.as_u64() - 1)), None);
    assert_eq!(pmm.frame_index(pmm.region().end()), None);
}

#[test]
fn region_too_small_is_rejected() {
    // one frame total: the reference table alone consumes it
    let mut arena = Arena::new(1);
    let (start, end) = arena.bounds();
    let result = unsafe { FrameAllocator::new(start, end) };
    assert_eq!(result.err(), Some(InitError::RegionTooSmall));

    // empty range
    let result = unsafe { FrameAllocator::new(end, end) };
    assert_eq!(result.err(), Some(InitError::RegionTooSmall));
}

#[test]
fn unaligned_start_is_rounded_up() {
    let mut arena = Arena::new(16);
    let (start, end) = arena.bounds();
    let pmm = unsafe { FrameAllocator::new(start + 1, end) }.expect("enough frames");
    assert!(pmm.region().base().is_frame_aligned());
    // one frame lost to rounding, one carved for the reference table
    assert_eq!(pmm.frame_count(), 14);
    assert_eq!(pmm.free_frames(), 14);
}
