#![no_main]

use arbitrary::Arbitrary;
use fritz2_core::{ListDiffer, apply_batch};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Versions {
    lists: Vec<Vec<(u8, u8)>>,
}

fuzz_target!(|input: Versions| {
    let mut differ = ListDiffer::new(|item: &(u8, u8)| item.0);
    let mut mirror: Vec<(u8, u8)> = Vec::new();
    for list in input.lists.iter().take(32) {
        match differ.next(list) {
            Ok(batch) => {
                apply_batch(&mut mirror, &batch).expect("batch replays against mirror");
                let keys: Vec<u8> = mirror.iter().map(|(k, _)| *k).collect();
                assert_eq!(keys, differ.keys());
            }
            Err(_) => assert!(has_duplicates(list)),
        }
    }
});

fn has_duplicates(list: &[(u8, u8)]) -> bool {
    let mut seen = [false; 256];
    list.iter().any(|(k, _)| std::mem::replace(&mut seen[*k as usize], true))
}
