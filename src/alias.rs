//! Alias-family pre-pass (§4.7).

use hashbrown::HashMap;

const MODEL_RANK: &[&str] = &["obj", "glb", "gltf", "fbx", "dae", "stl", "blend", "3ds", "skp"];
const IMAGE_RANK: &[&[&str]] = &[&["png"], &["jpg", "jpeg"], &["svg"]];
const AUDIO_RANK: &[&str] = &["ogg"];

fn model_rank(ext: &str) -> Option<usize> {
    MODEL_RANK.iter().position(|e| *e == ext)
}

fn image_rank(ext: &str) -> Option<usize> {
    IMAGE_RANK.iter().position(|group| group.contains(&ext))
}

fn audio_rank(ext: &str) -> Option<usize> {
    AUDIO_RANK.iter().position(|e| *e == ext)
}

/// splits a path into `(stem_without_extension, extension)`, both lowercased.
fn split_ext(path: &str) -> (String, String) {
    let lower = path.to_ascii_lowercase();
    match lower.rfind('.') {
        Some(dot) if dot > lower.rfind('/').map(|s| s + 1).unwrap_or(0) => {
            (lower[..dot].to_string(), lower[dot + 1..].to_string())
        }
        _ => (lower, String::new()),
    }
}

/// returns, for each family, the `(rank, stem)` classification of `ext`, or `None` if `ext`
/// does not belong to any family.
fn classify(ext: &str) -> Option<(&'static str, usize)> {
    if let Some(r) = model_rank(ext) {
        return Some(("model", r));
    }
    if let Some(r) = image_rank(ext) {
        return Some(("image", r));
    }
    if let Some(r) = audio_rank(ext) {
        return Some(("audio", r));
    }
    None
}

/// computes `alias_index -> canonical_row_index` for every non-canonical row in a family group.
/// Rows not present in the returned map are canonical (or belong to no family, or to a
/// singleton group).
pub fn plan_aliases(relative_paths: &[String]) -> HashMap<usize, usize> {
    let mut groups: HashMap<(&'static str, String), Vec<(usize, usize, String)>> = HashMap::new();

    for (i, path) in relative_paths.iter().enumerate() {
        let (stem, ext) = split_ext(path);
        let Some((family, rank)) = classify(&ext) else {
            continue;
        };
        groups
            .entry((family, stem))
            .or_default()
            .push((i, rank, path.to_ascii_lowercase()));
    }

    let mut result = HashMap::new();
    for members in groups.into_values() {
        if members.len() < 2 {
            continue;
        }

        let mut sorted = members.clone();
        sorted.sort_by(|a, b| (a.1, &a.2).cmp(&(b.1, &b.2)));
        let canonical = sorted[0].0;

        for (index, _, _) in members {
            if index != canonical {
                result.insert(index, canonical);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn obj_beats_fbx_for_same_stem() {
        let paths = vec!["m/cube.obj".to_string(), "m/cube.fbx".to_string()];
        let aliases = plan_aliases(&paths);

        check!(aliases.get(&1) == Some(&0));
        check!(!aliases.contains_key(&0));
    }

    #[test]
    fn jpg_and_jpeg_tie_then_fall_back_to_path() {
        let paths = vec!["t/x.jpeg".to_string(), "t/x.jpg".to_string()];
        let aliases = plan_aliases(&paths);

        // both have image rank 1; tiebreak is lowercased path: "t/x.jpeg" < "t/x.jpg"
        check!(aliases.get(&1) == Some(&0));
    }

    #[test]
    fn singleton_groups_have_no_alias() {
        let paths = vec!["m/cube.obj".to_string(), "a/theme.ogg".to_string()];
        let aliases = plan_aliases(&paths);
        check!(aliases.is_empty());
    }

    #[test]
    fn unrelated_extensions_are_ignored() {
        let paths = vec!["doc/readme.txt".to_string(), "doc/readme.md".to_string()];
        let aliases = plan_aliases(&paths);
        check!(aliases.is_empty());
    }
}
