//! Hall geometry: which seats exist for a hall and seat category.
//!
//! Layouts are read-only after startup. [`HallLayouts`] validates every
//! hall once and precomputes a [`SeatMap`] per hall + category so the
//! inventory never regenerates geometry on the request path.

mod generator;
mod halls;

pub use generator::{generate_seats, row_letter, MAX_ROWS};

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Row letter followed by an absolute column number, e.g. `B24`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(String);

impl SeatId {
    pub fn new(row: char, column: u16) -> Self {
        Self(format!("{row}{column}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SeatId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pricing and seating tier. Each category has its own geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatCategory {
    Regular,
    Vip,
}

impl SeatCategory {
    pub const ALL: [SeatCategory; 2] = [SeatCategory::Regular, SeatCategory::Vip];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatCategory::Regular => "regular",
            SeatCategory::Vip => "vip",
        }
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(SeatCategory::Regular),
            "vip" => Ok(SeatCategory::Vip),
            other => Err(format!("unknown seat category '{other}'")),
        }
    }
}

/// Short auditorium code such as `C1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HallCode(String);

impl HallCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HallCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_start_column() -> u16 {
    1
}

/// One block of seats inside a hall + category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub rows: u8,
    pub cols: u16,
    #[serde(default = "default_start_column")]
    pub start_column: u16,
    #[serde(default)]
    pub reversed: bool,
    /// Row letter -> the only columns that physically exist on that row.
    #[serde(default)]
    pub sparse_rows: BTreeMap<String, Vec<u16>>,
    /// Seats that take up space but can never be sold.
    #[serde(default)]
    pub disabled_seats: Vec<SeatId>,
}

impl Section {
    pub fn new(name: &str, rows: u8, cols: u16, start_column: u16) -> Self {
        Self {
            name: name.to_string(),
            rows,
            cols,
            start_column,
            reversed: false,
            sparse_rows: BTreeMap::new(),
            disabled_seats: Vec::new(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn sparse_row(mut self, row: char, columns: &[u16]) -> Self {
        self.sparse_rows.insert(row.to_string(), columns.to_vec());
        self
    }

    pub fn disabled(mut self, seats: &[&str]) -> Self {
        self.disabled_seats.extend(seats.iter().map(|s| SeatId::from(*s)));
        self
    }

    pub fn seats(&self) -> Vec<SeatId> {
        generate_seats(
            self.rows,
            self.cols,
            self.start_column,
            &self.sparse_rows,
            self.reversed,
        )
    }

    fn last_column(&self) -> u32 {
        u32::from(self.start_column) + u32::from(self.cols) - 1
    }
}

/// Geometry of one hall, per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HallLayout {
    pub regular: Vec<Section>,
    pub vip: Vec<Section>,
}

impl HallLayout {
    pub fn sections(&self, category: SeatCategory) -> &[Section] {
        match category {
            SeatCategory::Regular => &self.regular,
            SeatCategory::Vip => &self.vip,
        }
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("no halls configured")]
    NoHalls,

    #[error("hall {hall} has no {category} sections")]
    EmptyCategory { hall: HallCode, category: SeatCategory },

    #[error("hall {hall} {category} section '{section}' has no seats")]
    EmptySection {
        hall: HallCode,
        category: SeatCategory,
        section: String,
    },

    #[error("hall {hall} {category} section '{section}' has {rows} rows, at most 26 are addressable")]
    TooManyRows {
        hall: HallCode,
        category: SeatCategory,
        section: String,
        rows: u8,
    },

    #[error("hall {hall} {category} section '{section}' must start at column 1 or later")]
    InvalidStartColumn {
        hall: HallCode,
        category: SeatCategory,
        section: String,
    },

    #[error("hall {hall} {category} section '{section}': sparse row '{row}' is not a row of this section")]
    InvalidSparseRow {
        hall: HallCode,
        category: SeatCategory,
        section: String,
        row: String,
    },

    #[error("hall {hall} {category} section '{section}': column {column} on row {row} is outside the section")]
    SparseColumnOutOfRange {
        hall: HallCode,
        category: SeatCategory,
        section: String,
        row: String,
        column: u16,
    },

    #[error("hall {hall} {category} section '{section}': disabled seat {seat} is not part of the section")]
    DisabledSeatOutsideSection {
        hall: HallCode,
        category: SeatCategory,
        section: String,
        seat: SeatId,
    },

    #[error("hall {hall} {category}: seat {seat} appears in more than one section")]
    DuplicateSeat {
        hall: HallCode,
        category: SeatCategory,
        seat: SeatId,
    },

    #[error("failed to load hall layouts: {0}")]
    Load(#[from] config::ConfigError),
}

/// How a seat id relates to a category's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClass {
    Reservable,
    Disabled,
    Unknown,
}

/// Precomputed geometry of one hall + category.
#[derive(Debug, Clone)]
pub struct SeatMap {
    seats: Vec<SeatId>,
    known: HashSet<SeatId>,
    disabled: BTreeSet<SeatId>,
}

impl SeatMap {
    /// Every seat in the geometry, disabled ones included, in layout order.
    pub fn all_seats(&self) -> &[SeatId] {
        &self.seats
    }

    /// Seats a caller may reserve, in layout order.
    pub fn universe(&self) -> Vec<SeatId> {
        self.seats
            .iter()
            .filter(|seat| !self.disabled.contains(*seat))
            .cloned()
            .collect()
    }

    pub fn disabled(&self) -> &BTreeSet<SeatId> {
        &self.disabled
    }

    pub fn classify(&self, seat: &SeatId) -> SeatClass {
        if !self.known.contains(seat) {
            SeatClass::Unknown
        } else if self.disabled.contains(seat) {
            SeatClass::Disabled
        } else {
            SeatClass::Reservable
        }
    }

    pub fn is_reservable(&self, seat: &SeatId) -> bool {
        self.classify(seat) == SeatClass::Reservable
    }
}

#[derive(Debug, Clone)]
struct CompiledHall {
    layout: HallLayout,
    regular: SeatMap,
    vip: SeatMap,
}

/// Validated, process-wide hall configuration.
#[derive(Debug, Clone)]
pub struct HallLayouts {
    halls: BTreeMap<HallCode, CompiledHall>,
}

/// On-disk shape of a layout file: `[halls.C1] regular = [...]`.
#[derive(Debug, Deserialize)]
struct HallLayoutsFile {
    halls: BTreeMap<String, HallLayout>,
}

impl HallLayouts {
    /// The three auditoriums shipped with the service.
    pub fn builtin() -> Result<Self, LayoutError> {
        Self::from_layouts(halls::builtin_halls())
    }

    /// Reads a TOML/JSON/YAML layout file, format picked by extension.
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let file: HallLayoutsFile = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        Self::from_layouts(
            file.halls
                .into_iter()
                .map(|(code, layout)| (HallCode::new(code), normalize_rows(layout)))
                .collect(),
        )
    }

    pub fn from_layouts(layouts: BTreeMap<HallCode, HallLayout>) -> Result<Self, LayoutError> {
        if layouts.is_empty() {
            return Err(LayoutError::NoHalls);
        }

        let mut halls = BTreeMap::new();
        for (code, layout) in layouts {
            let regular = compile_category(&code, SeatCategory::Regular, &layout)?;
            let vip = compile_category(&code, SeatCategory::Vip, &layout)?;
            halls.insert(code, CompiledHall { layout, regular, vip });
        }

        Ok(Self { halls })
    }

    pub fn contains(&self, hall: &HallCode) -> bool {
        self.halls.contains_key(hall)
    }

    pub fn hall_codes(&self) -> impl Iterator<Item = &HallCode> {
        self.halls.keys()
    }

    pub fn layout(&self, hall: &HallCode) -> Option<&HallLayout> {
        self.halls.get(hall).map(|h| &h.layout)
    }

    pub fn seat_map(&self, hall: &HallCode, category: SeatCategory) -> Option<&SeatMap> {
        self.halls.get(hall).map(|h| match category {
            SeatCategory::Regular => &h.regular,
            SeatCategory::Vip => &h.vip,
        })
    }
}

// Some config sources lowercase keys; row letters are always uppercase.
fn normalize_rows(mut layout: HallLayout) -> HallLayout {
    for section in layout.regular.iter_mut().chain(layout.vip.iter_mut()) {
        section.sparse_rows = std::mem::take(&mut section.sparse_rows)
            .into_iter()
            .map(|(row, columns)| (row.to_ascii_uppercase(), columns))
            .collect();
    }
    layout
}

fn compile_category(
    hall: &HallCode,
    category: SeatCategory,
    layout: &HallLayout,
) -> Result<SeatMap, LayoutError> {
    let sections = layout.sections(category);
    if sections.is_empty() {
        return Err(LayoutError::EmptyCategory {
            hall: hall.clone(),
            category,
        });
    }

    let mut seats = Vec::new();
    let mut known = HashSet::new();
    let mut disabled = BTreeSet::new();

    for section in sections {
        validate_section(hall, category, section)?;

        let section_seats = section.seats();
        let section_set: HashSet<&SeatId> = section_seats.iter().collect();

        for seat in &section.disabled_seats {
            if !section_set.contains(seat) {
                return Err(LayoutError::DisabledSeatOutsideSection {
                    hall: hall.clone(),
                    category,
                    section: section.name.clone(),
                    seat: seat.clone(),
                });
            }
            disabled.insert(seat.clone());
        }

        for seat in section_seats {
            if !known.insert(seat.clone()) {
                return Err(LayoutError::DuplicateSeat {
                    hall: hall.clone(),
                    category,
                    seat,
                });
            }
            seats.push(seat);
        }
    }

    Ok(SeatMap {
        seats,
        known,
        disabled,
    })
}

fn validate_section(
    hall: &HallCode,
    category: SeatCategory,
    section: &Section,
) -> Result<(), LayoutError> {
    if section.rows == 0 || section.cols == 0 {
        return Err(LayoutError::EmptySection {
            hall: hall.clone(),
            category,
            section: section.name.clone(),
        });
    }
    if section.rows > MAX_ROWS {
        return Err(LayoutError::TooManyRows {
            hall: hall.clone(),
            category,
            section: section.name.clone(),
            rows: section.rows,
        });
    }
    if section.start_column == 0 || section.last_column() > u32::from(u16::MAX) {
        return Err(LayoutError::InvalidStartColumn {
            hall: hall.clone(),
            category,
            section: section.name.clone(),
        });
    }

    let rows: HashSet<String> = (0..section.rows).map(|r| row_letter(r).to_string()).collect();
    for (row, columns) in &section.sparse_rows {
        if !rows.contains(row) {
            return Err(LayoutError::InvalidSparseRow {
                hall: hall.clone(),
                category,
                section: section.name.clone(),
                row: row.clone(),
            });
        }
        let first = u32::from(section.start_column);
        if let Some(&column) = columns
            .iter()
            .find(|&&c| u32::from(c) < first || u32::from(c) > section.last_column())
        {
            return Err(LayoutError::SparseColumnOutOfRange {
                hall: hall.clone(),
                category,
                section: section.name.clone(),
                row: row.clone(),
                column,
            });
        }
    }

    Ok(())
}
