//! Destination path computation

use moov_fs::NormalizedPath;

use crate::model::Item;
use crate::template::Template;

/// Compute where `item`'s file should live under `dest_root`.
///
/// The file keeps its base name. With `into_subfolder`, the template is
/// expanded against the parent record's metadata (attachments carry none
/// of their own; a top-level attachment uses itself) and each `/`-separated
/// segment becomes a directory. Empty, `.` and `..` segments are dropped so
/// a template can never climb out of `dest_root`.
///
/// Returns `None` when the item has no file path.
pub fn compute_destination(
    item: &Item,
    parent: Option<&Item>,
    dest_root: &NormalizedPath,
    into_subfolder: bool,
    subdir_template: &str,
) -> Option<NormalizedPath> {
    let file_name = item.file_path()?.file_name()?;

    let mut destination = dest_root.clone();
    if into_subfolder {
        let metadata = &parent.unwrap_or(item).metadata;
        let subdir = Template::parse(subdir_template).render(metadata);
        destination = destination.join_all(
            subdir
                .split('/')
                .map(str::trim)
                .filter(|segment| !matches!(*segment, "" | "." | "..")),
        );
    }

    Some(destination.join(file_name))
}
