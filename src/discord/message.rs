use crate::models::{UpdateLink, EMOJI_NEW};
use crate::parsers::clean_text;

/// Discord rejects `content` longer than this.
pub const DISCORD_CONTENT_LIMIT: usize = 2000;

const MAX_TITLE_CHARS: usize = 250;

/// Build the message bodies announcing `links`.
///
/// Everything goes into a single message when it fits; otherwise the
/// entries are split across consecutive messages, each starting with
/// `prefix` and never exceeding `DISCORD_CONTENT_LIMIT` characters.
/// Entry order follows `links`. An entry too long for an empty message
/// loses its title, and then the tail of its URL.
pub fn build_messages(links: &[UpdateLink], prefix: &str) -> Vec<String> {
    if links.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();
    let mut current = format!("{}{} {}", prefix, EMOJI_NEW, headline(links.len()));
    let mut has_entries = false;
    let mut needs_separator = true;

    for link in links {
        let mut entry = format_entry(link);

        if has_entries && char_len(&current) + 1 + char_len(&entry) > DISCORD_CONTENT_LIMIT {
            messages.push(std::mem::replace(&mut current, prefix.to_string()));
            needs_separator = false;
        }

        let room = DISCORD_CONTENT_LIMIT
            .saturating_sub(char_len(&current))
            .saturating_sub(usize::from(needs_separator));
        if char_len(&entry) > room {
            entry = clamp_entry(link.url(), room);
        }

        if needs_separator {
            current.push('\n');
        }
        current.push_str(&entry);
        has_entries = true;
        needs_separator = true;
    }

    messages.push(current);
    messages
}

fn headline(count: usize) -> String {
    if count == 1 {
        "New update:".to_string()
    } else {
        format!("{} new updates:", count)
    }
}

fn format_entry(link: &UpdateLink) -> String {
    let title = clean_text(&link.title);
    if title.is_empty() {
        return link.url().to_string();
    }

    let title = if char_len(&title) > MAX_TITLE_CHARS {
        let truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
        format!("{}...", truncated.trim_end())
    } else {
        title
    };

    format!("**{}**\n{}", title, link.url())
}

fn clamp_entry(url: &str, room: usize) -> String {
    if char_len(url) <= room {
        url.to_string()
    } else {
        url.chars().take(room).collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_link_message() {
        let links = vec![UpdateLink::new(
            "https://www.maplesea.com/updates/patch-notes",
            "v250 Patch Notes",
        )];

        assert_eq!(
            build_messages(&links, ""),
            vec!["🆕 New update:\n**v250 Patch Notes**\nhttps://www.maplesea.com/updates/patch-notes".to_string()]
        );
    }

    #[test]
    fn batch_lists_links_in_order_with_prefix() {
        let links = vec![
            UpdateLink::new("https://a.test/updates/2", "Second &amp; newest"),
            UpdateLink::new("https://a.test/updates/1", ""),
        ];

        let messages = build_messages(&links, "@everyone ");

        assert_eq!(
            messages,
            vec!["@everyone 🆕 2 new updates:\n**Second & newest**\nhttps://a.test/updates/2\nhttps://a.test/updates/1".to_string()]
        );
    }

    #[test]
    fn no_links_no_messages() {
        assert!(build_messages(&[], "").is_empty());
    }

    #[test]
    fn long_batches_are_split_under_the_limit() {
        let links: Vec<UpdateLink> = (0..60)
            .map(|i| UpdateLink::new(format!("https://a.test/updates/{}", i), "x".repeat(40)))
            .collect();

        let messages = build_messages(&links, "<@42> ");

        assert!(messages.len() > 1);
        for message in &messages {
            assert!(message.chars().count() <= DISCORD_CONTENT_LIMIT);
            assert!(message.starts_with("<@42> "));
        }

        // every link appears exactly once, in order
        let joined = messages.join("\n");
        let mut last = 0;
        for link in &links {
            let pos = joined
                .find(&format!("{}\n", link.url()))
                .or_else(|| joined.rfind(link.url()))
                .unwrap();
            assert!(pos >= last);
            last = pos;
        }
    }

    #[test]
    fn oversized_entries_are_clamped_to_the_limit() {
        let huge_url = format!("https://a.test/updates/{}", "q".repeat(2100));
        let links = vec![
            UpdateLink::new(huge_url.clone(), "Huge"),
            UpdateLink::new("https://a.test/updates/small", "Small"),
        ];

        let messages = build_messages(&links, "<@1> ");

        assert_eq!(messages.len(), 2);
        for message in &messages {
            assert!(message.chars().count() <= DISCORD_CONTENT_LIMIT);
            assert!(message.starts_with("<@1> "));
        }
        assert!(messages[0].starts_with("<@1> 🆕 2 new updates:\nhttps://a.test/updates/qqq"));
        assert_eq!(messages[1], "<@1> **Small**\nhttps://a.test/updates/small");
    }

    #[test]
    fn entry_that_only_fits_without_title_keeps_its_url() {
        let url = format!("https://a.test/updates/{}", "u".repeat(1900));
        let links = vec![UpdateLink::new(url.clone(), "t".repeat(200))];

        let messages = build_messages(&links, "");

        assert_eq!(messages, vec![format!("🆕 New update:\n{}", url)]);
    }

    #[test]
    fn long_titles_are_truncated() {
        let links = vec![UpdateLink::new("https://a.test/updates/1", "t".repeat(400))];

        let message = &build_messages(&links, "")[0];

        assert!(message.contains(&format!("**{}...**", "t".repeat(MAX_TITLE_CHARS))));
    }
}
