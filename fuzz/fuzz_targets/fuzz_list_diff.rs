#![no_main]

//! Arbitrary old/new keyed lists: the batch must replay to the new list,
//! and duplicate ids in the new list must be rejected instead of panicking.
//! Old keys come from a previous successful diff, so they are deduplicated.

use fritz2_core::{apply_batch, diff_keyed};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (mut old, new) = input;
    let mut seen = [false; 256];
    old.retain(|k| !std::mem::replace(&mut seen[*k as usize], true));
    let Ok(batch) = diff_keyed(&old, &new, |k: &u8| *k) else {
        return;
    };
    let mut replay = old.clone();
    apply_batch(&mut replay, &batch).expect("batch replays against its own base");
    assert_eq!(replay, new);
});
