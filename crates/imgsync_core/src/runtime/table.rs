//! Runtime image-table parsing.

use crate::model::image::ImageRecord;

const MIN_COLUMNS: usize = 4;

/// Parses `<runtime> images` table output into records.
///
/// The first line is the header and is discarded. Each remaining line is
/// split on whitespace; lines with fewer than four tokens are skipped. The
/// first three tokens are repository, tag and identifier, and the last token
/// is the size, so the multi-word "created" column in between is ignored.
pub fn parse_image_table(output: &str) -> Vec<ImageRecord> {
    output
        .lines()
        .skip(1)
        .filter_map(parse_image_line)
        .collect()
}

fn parse_image_line(line: &str) -> Option<ImageRecord> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < MIN_COLUMNS {
        return None;
    }

    Some(ImageRecord::new(
        columns[0],
        columns[1],
        columns[2],
        columns[columns.len() - 1],
    ))
}

#[cfg(test)]
mod tests {
    use super::parse_image_table;

    #[test]
    fn header_only_yields_nothing() {
        assert!(parse_image_table("REPOSITORY TAG IMAGE ID CREATED SIZE").is_empty());
        assert!(parse_image_table("").is_empty());
    }

    #[test]
    fn size_is_last_token_even_with_short_created_column() {
        let records = parse_image_table("H\nbusybox musl 1a2b3c 9kB");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "9kB");
    }
}
