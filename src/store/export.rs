//! CSV export of stored posts.

use crate::store::StoredPost;
use std::borrow::Cow;

pub const CSV_HEADER: &str = "Group Name,Author,Content,Likes,Comments,Shares,Post Type,Timestamp,URL";

/// Quote a field when it contains a separator, a quote or a line break.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render records as CSV, header first, one line per record.
///
/// Content is always quoted; other text fields only when needed.
pub fn export_csv<'a>(records: impl IntoIterator<Item = &'a StoredPost>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in records {
        let p = &r.post;
        let line = [
            escape(&r.group_name).into_owned(),
            escape(p.author_name.as_deref().unwrap_or_default()).into_owned(),
            format!("\"{}\"", p.content.replace('"', "\"\"")),
            p.likes.to_string(),
            p.comments.to_string(),
            p.shares.to_string(),
            p.post_type.to_string(),
            p.post_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            escape(&p.url).into_owned(),
        ]
        .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_now, sample_post};

    #[test]
    fn test_export_quotes_and_escapes() {
        let mut post = sample_post("1");
        post.author_name = Some("Doe, Jane".into());
        post.content = "She said \"hi\"\nthen left".into();
        post.likes = 2500;
        post.url = "https://www.facebook.com/groups/123/posts/1".into();
        let record = StoredPost::new(post, "Bikes", fixed_now());

        let csv = export_csv([&record]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert!(csv.contains("Bikes,\"Doe, Jane\",\"She said \"\"hi\"\"\nthen left\",2500,0,0,text,2025-05-06 12:00:00,https://www.facebook.com/groups/123/posts/1\n"));
    }

    #[test]
    fn test_export_empty() {
        assert_eq!(export_csv(std::iter::empty()), format!("{CSV_HEADER}\n"));
    }
}
