use crate::model::{RefKind, Reference};

/// One row of the references view: a group header or a reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefRow {
    Header(String),
    Ref { idx: usize, depth: usize },
}

/// Group references under Local, Remote (one sub-header per remote) and Tags.
/// `refs` must already be sorted by kind, then name.
pub fn build_rows(refs: &[Reference]) -> Vec<RefRow> {
    let mut rows = Vec::new();
    let mut current_kind: Option<RefKind> = None;
    let mut current_remote: Option<&str> = None;

    for (idx, r) in refs.iter().enumerate() {
        if current_kind != Some(r.kind) {
            current_kind = Some(r.kind);
            current_remote = None;
            let title = match r.kind {
                RefKind::LocalBranch => "Local",
                RefKind::RemoteBranch => "Remote",
                RefKind::Tag => "Tags",
            };
            rows.push(RefRow::Header(title.to_string()));
        }

        let depth = match r.kind {
            RefKind::RemoteBranch => {
                let (remote, rest) = r.name.split_once('/').unwrap_or((r.name.as_str(), ""));
                if current_remote != Some(remote) {
                    current_remote = Some(remote);
                    rows.push(RefRow::Header(format!("  {}", remote)));
                }
                1 + rest.matches('/').count()
            }
            _ => r.name.matches('/').count(),
        };
        rows.push(RefRow::Ref { idx, depth });
    }

    rows
}

pub fn reference_at<'a>(rows: &[RefRow], refs: &'a [Reference], row: usize) -> Option<&'a Reference> {
    match rows.get(row)? {
        RefRow::Ref { idx, .. } => refs.get(*idx),
        RefRow::Header(_) => None,
    }
}

pub fn row_of(rows: &[RefRow], refs: &[Reference], name: &str) -> Option<usize> {
    rows.iter().position(|r| match r {
        RefRow::Ref { idx, .. } => refs.get(*idx).is_some_and(|r| r.name == name),
        RefRow::Header(_) => false,
    })
}

pub fn first_selectable(rows: &[RefRow]) -> Option<usize> {
    rows.iter().position(|r| matches!(r, RefRow::Ref { .. }))
}

/// Move `cur` by `delta`, skipping headers in the direction of travel.
pub fn move_selection(rows: &[RefRow], cur: usize, delta: isize) -> usize {
    if rows.is_empty() {
        return 0;
    }
    let last = rows.len() as isize - 1;
    let mut next = (cur as isize + delta).clamp(0, last);
    let step = if delta >= 0 { 1 } else { -1 };

    while let Some(row) = rows.get(next as usize) {
        if matches!(row, RefRow::Ref { .. }) {
            return next as usize;
        }
        if (next == 0 && step < 0) || (next == last && step > 0) {
            break;
        }
        next += step;
    }

    // Ran into the edge on a header; fall back to the nearest reference.
    let mut back = next;
    while let Some(row) = rows.get(back as usize) {
        if matches!(row, RefRow::Ref { .. }) {
            return back as usize;
        }
        back -= step;
        if !(0..=last).contains(&back) {
            break;
        }
    }
    cur.min(last as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(name: &str, kind: RefKind) -> Reference {
        Reference {
            name: name.to_string(),
            kind,
            target: "c1".to_string(),
            is_head: false,
        }
    }

    fn sample() -> Vec<Reference> {
        vec![
            r("feature/x", RefKind::LocalBranch),
            r("main", RefKind::LocalBranch),
            r("origin/main", RefKind::RemoteBranch),
            r("upstream/dev", RefKind::RemoteBranch),
            r("v1.0", RefKind::Tag),
        ]
    }

    #[test]
    fn test_groups_and_remote_subheaders() {
        let refs = sample();
        let rows = build_rows(&refs);
        let headers: Vec<&str> = rows
            .iter()
            .filter_map(|r| match r {
                RefRow::Header(h) => Some(h.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(headers, vec!["Local", "Remote", "  origin", "  upstream", "Tags"]);
        assert_eq!(rows[1], RefRow::Ref { idx: 0, depth: 1 });
        assert_eq!(row_of(&rows, &refs, "v1.0"), Some(rows.len() - 1));
    }

    #[test]
    fn test_move_selection_skips_headers() {
        let refs = sample();
        let rows = build_rows(&refs);
        let first = first_selectable(&rows).unwrap();
        assert_eq!(first, 1);
        assert_eq!(move_selection(&rows, first, -1), 1);

        let main = move_selection(&rows, first, 1);
        assert_eq!(reference_at(&rows, &refs, main).unwrap().name, "main");
        let origin = move_selection(&rows, main, 1);
        assert_eq!(reference_at(&rows, &refs, origin).unwrap().name, "origin/main");
        let back = move_selection(&rows, origin, -1);
        assert_eq!(back, main);

        let end = move_selection(&rows, first, 100);
        assert_eq!(reference_at(&rows, &refs, end).unwrap().name, "v1.0");
    }
}
