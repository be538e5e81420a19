//! Image repository contract and store-backed implementation.
//!
//! # Invariants
//! - Each insert is its own commit; a failing insert leaves earlier rows in
//!   place.
//! - Reads return rows in store order, without deduplication.

use crate::db::{StoreGateway, StoreResult};
use crate::model::image::ImageRecord;
use rusqlite::{params, Row};

const IMAGE_INSERT_SQL: &str =
    "INSERT INTO images (repository, tag, hash, size) VALUES (?1, ?2, ?3, ?4);";
const IMAGE_SELECT_SQL: &str = "SELECT repository, tag, hash, size FROM images;";

/// Repository interface for stored image rows.
pub trait ImageRepository {
    fn insert_image(&self, record: &ImageRecord) -> StoreResult<()>;
    fn list_images(&self) -> StoreResult<Vec<ImageRecord>>;
}

/// Image repository over a connected `StoreGateway`.
pub struct StoreImageRepository<'g> {
    gateway: &'g StoreGateway,
}

impl<'g> StoreImageRepository<'g> {
    pub fn new(gateway: &'g StoreGateway) -> Self {
        Self { gateway }
    }
}

impl ImageRepository for StoreImageRepository<'_> {
    fn insert_image(&self, record: &ImageRecord) -> StoreResult<()> {
        self.gateway.execute(
            IMAGE_INSERT_SQL,
            params![
                record.repository.as_str(),
                record.tag.as_str(),
                record.identifier.as_str(),
                record.size.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_images(&self) -> StoreResult<Vec<ImageRecord>> {
        self.gateway.query(IMAGE_SELECT_SQL, [], parse_image_row)
    }
}

fn parse_image_row(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    Ok(ImageRecord {
        repository: row.get("repository")?,
        tag: row.get("tag")?,
        identifier: row.get("hash")?,
        size: row.get("size")?,
    })
}
