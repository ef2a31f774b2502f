use std::collections::BTreeMap;

use super::{HallCode, HallLayout, Section};

/// Auditoriums C1–C3 as they are physically laid out.
pub(super) fn builtin_halls() -> BTreeMap<HallCode, HallLayout> {
    let mut halls = BTreeMap::new();

    halls.insert(
        HallCode::new("C1"),
        HallLayout {
            regular: vec![
                Section::new("left", 9, 6, 1),
                Section::new("middle", 9, 11, 7),
                Section::new("right", 9, 6, 18),
            ],
            vip: vec![
                Section::new("left", 4, 7, 1),
                Section::new("middle", 5, 8, 8),
                Section::new("right", 4, 9, 16).disabled(&["B24"]),
            ],
        },
    );

    halls.insert(
        HallCode::new("C2"),
        HallLayout {
            regular: vec![
                Section::new("left", 12, 6, 1).sparse_row('L', &[1, 2, 3]),
                Section::new("right", 12, 6, 7),
            ],
            vip: vec![
                Section::new("left", 5, 4, 1).sparse_row('E', &[1, 2, 3]),
                Section::new("right", 5, 8, 5).disabled(&["E5"]),
            ],
        },
    );

    // C3 is numbered right to left.
    halls.insert(
        HallCode::new("C3"),
        HallLayout {
            regular: vec![
                Section::new("left", 12, 6, 7).reversed(),
                Section::new("right", 12, 6, 1)
                    .reversed()
                    .sparse_row('L', &[1, 2, 3, 4, 5, 6])
                    .disabled(&["L4", "L5", "L6"]),
            ],
            vip: vec![
                Section::new("left", 5, 4, 9)
                    .reversed()
                    .sparse_row('E', &[10, 11, 12]),
                Section::new("right", 5, 8, 1)
                    .reversed()
                    .sparse_row('E', &[1, 2, 3, 4, 5, 6, 7, 8])
                    .disabled(&["E8"]),
            ],
        },
    );

    halls
}
