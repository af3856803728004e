use std::fmt::Write;

use migrator_core::{AppViewModel, ChallengeView, ConversationOption, Phase};

use super::constants::*;
use super::layout::{page, PageChrome};

/// Renders the whole page for one session's view model.
pub fn render(view: &AppViewModel, chrome: &PageChrome) -> String {
    let mut body = String::new();

    if let Some(error) = &view.error {
        banner(&mut body, "error", &format!("⚠️ {error}"));
    }
    if view.show_login {
        login_section(&mut body, view);
    } else {
        banner(&mut body, "success", "✅ Connected.");
        if let Some(token) = &view.session_token {
            session_token_section(&mut body, token);
        }
        migration_section(&mut body, view);
    }
    if let Some(status) = &view.status {
        banner(&mut body, "info", &format!("⏳ {status}"));
    }
    if let Some(summary) = &view.summary {
        banner(&mut body, "success", &format!("🏁 {summary}"));
    }
    activity_section(&mut body, &view.activity);

    page(&body, view.busy, chrome)
}

fn login_section(out: &mut String, view: &AppViewModel) {
    let disabled = disabled_attr(view.login_enabled);
    let _ = write!(
        out,
        r#"<section>
<h2>1. Sign in</h2>
<form method="post" action="{ROUTE_CONNECT}">
<label for="{FIELD_APP_ID}">Application id</label>
<input id="{FIELD_APP_ID}" name="{FIELD_APP_ID}" inputmode="numeric" autocomplete="off"{disabled}>
<label for="{FIELD_APP_SECRET}">Application secret</label>
<input id="{FIELD_APP_SECRET}" name="{FIELD_APP_SECRET}" type="password" autocomplete="off"{disabled}>
<button type="submit"{disabled}>Generate QR code</button>
</form>
"#
    );
    if let Some(challenge) = &view.challenge {
        challenge_block(out, challenge);
    }
    out.push_str("</section>\n");
}

fn challenge_block(out: &mut String, challenge: &ChallengeView) {
    out.push_str(r#"<div class="qr">"#);
    match &challenge.image {
        Some(image) => {
            let _ = write!(
                out,
                r#"<img src="{}" alt="Login QR code">"#,
                escape(image)
            );
        }
        None => {
            let _ = write!(
                out,
                "<p>Open this link on a signed-in device: <code>{}</code></p>",
                escape(&challenge.url)
            );
        }
    }
    out.push_str("</div>\n");
}

fn session_token_section(out: &mut String, token: &str) {
    let _ = write!(
        out,
        r#"<details>
<summary>🔑 Session key (keep it private)</summary>
<p><code>{}</code></p>
<p>Anyone holding this key can act as your account. Store it somewhere safe or discard it.</p>
</details>
"#,
        escape(token)
    );
}

fn migration_section(out: &mut String, view: &AppViewModel) {
    out.push_str("<section>\n<h2>2. Migrate media</h2>\n");

    if view.conversations.is_empty() {
        if view.phase == Phase::Authenticated && view.error.is_none() {
            out.push_str("<p>Loading conversations...</p>\n");
        }
    } else {
        let disabled = disabled_attr(view.migrate_enabled);
        let _ = write!(
            out,
            r#"<form method="post" action="{ROUTE_MIGRATE}">
<label for="{FIELD_SOURCE}">Source (copy from)</label>
<select id="{FIELD_SOURCE}" name="{FIELD_SOURCE}"{disabled}>
{}</select>
<label for="{FIELD_DESTINATION}">Destination (copy to)</label>
<select id="{FIELD_DESTINATION}" name="{FIELD_DESTINATION}"{disabled}>
{}</select>
<button type="submit"{disabled}>🚀 Start migration</button>
</form>
"#,
            options(&view.conversations, |option| option.is_source),
            options(&view.conversations, |option| option.is_destination),
        );
    }

    let _ = write!(
        out,
        "{}{}{}",
        action_button(ROUTE_CANCEL, "Cancel", view.cancel_enabled),
        action_button(ROUTE_RELOAD, "Reload conversations", view.reload_enabled),
        action_button(ROUTE_SIGN_OUT, "Sign out", view.sign_out_enabled),
    );

    if view.phase == Phase::Migrating || view.forwarded > 0 || view.failed > 0 {
        let _ = write!(
            out,
            "<p>Moved: {} · Skipped after errors: {}</p>\n",
            view.forwarded, view.failed
        );
    }
    out.push_str("</section>\n");
}

fn options(
    conversations: &[ConversationOption],
    selected: impl Fn(&ConversationOption) -> bool,
) -> String {
    let mut out = String::new();
    for option in conversations {
        let marker = if selected(option) { " selected" } else { "" };
        let _ = writeln!(
            out,
            r#"<option value="{}"{marker}>{}</option>"#,
            option.id,
            escape(&option.label)
        );
    }
    out
}

fn action_button(route: &str, label: &str, enabled: bool) -> String {
    format!(
        r#"<form class="inline" method="post" action="{route}"><button type="submit"{}>{label}</button></form>"#,
        disabled_attr(enabled)
    )
}

fn activity_section(out: &mut String, activity: &[String]) {
    if activity.is_empty() {
        return;
    }
    out.push_str("<section>\n<h2>Activity</h2>\n<div class=\"log\">");
    for line in activity {
        let _ = writeln!(out, "{}", escape(line));
    }
    out.push_str("</div>\n</section>\n");
}

fn banner(out: &mut String, class: &str, text: &str) {
    let _ = writeln!(out, r#"<div class="banner {class}">{}</div>"#, escape(text));
}

fn disabled_attr(enabled: bool) -> &'static str {
    if enabled {
        ""
    } else {
        " disabled"
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use migrator_core::{AppViewModel, ChallengeView, ConversationOption, Phase};
    use pretty_assertions::assert_eq;

    use super::{escape, render};
    use crate::platform::ui::layout::PageChrome;

    fn indexed_view() -> AppViewModel {
        AppViewModel {
            phase: Phase::Indexed,
            conversations: vec![
                ConversationOption {
                    id: 1,
                    label: "👤 Alice (ID: 1)".to_string(),
                    is_source: false,
                    is_destination: false,
                },
                ConversationOption {
                    id: -20,
                    label: "👥 <Family> (ID: -20)".to_string(),
                    is_source: false,
                    is_destination: true,
                },
            ],
            migrate_enabled: true,
            reload_enabled: true,
            sign_out_enabled: true,
            ..AppViewModel::default()
        }
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn login_form_masks_the_secret() {
        let view = AppViewModel {
            show_login: true,
            login_enabled: true,
            ..AppViewModel::default()
        };
        let html = render(&view, &PageChrome::default());
        assert!(html.contains(r#"name="app_secret" type="password""#));
        assert!(!html.contains("Start migration"));
    }

    #[test]
    fn challenge_shows_the_qr_image() {
        let view = AppViewModel {
            phase: Phase::AwaitingChallenge,
            show_login: true,
            busy: true,
            challenge: Some(ChallengeView {
                url: "tg://login?token=AQID".to_string(),
                image: Some("data:image/svg+xml;base64,PHN2Zz4=".to_string()),
                expires_in_secs: 30,
            }),
            ..AppViewModel::default()
        };
        let html = render(&view, &PageChrome::default());
        assert!(html.contains(r#"<img src="data:image/svg+xml;base64,PHN2Zz4=""#));
        assert!(html.contains(r#"http-equiv="refresh""#));
        assert!(html.contains("<button type=\"submit\" disabled>Generate QR code</button>"));
    }

    #[test]
    fn conversations_are_listed_escaped_with_selection() {
        let html = render(&indexed_view(), &PageChrome::default());
        assert!(html.contains(r#"<option value="1">👤 Alice (ID: 1)</option>"#));
        assert!(html.contains(r#"<option value="-20" selected>👥 &lt;Family&gt; (ID: -20)</option>"#));
        assert!(!html.contains("<Family>"));
        assert!(!html.contains(r#"http-equiv="refresh""#));
    }

    #[test]
    fn running_migration_disables_start_and_enables_cancel() {
        let view = AppViewModel {
            phase: Phase::Migrating,
            migrate_enabled: false,
            cancel_enabled: true,
            reload_enabled: false,
            sign_out_enabled: false,
            busy: true,
            forwarded: 7,
            status: Some("Moving file #7...".to_string()),
            ..indexed_view()
        };
        let html = render(&view, &PageChrome::default());
        assert!(html.contains("<button type=\"submit\" disabled>🚀 Start migration</button>"));
        assert!(html.contains(r#"action="/cancel"><button type="submit">Cancel</button>"#));
        assert!(html.contains("Moving file #7..."));
        assert!(html.contains("Moved: 7"));
    }

    #[test]
    fn summary_and_activity_are_shown() {
        let view = AppViewModel {
            phase: Phase::Done,
            summary: Some("Completed. 3 files moved.".to_string()),
            activity: vec!["Loaded 2 conversations.".to_string()],
            session_token: Some("1BVts".to_string()),
            ..indexed_view()
        };
        let html = render(&view, &PageChrome::default());
        assert!(html.contains("🏁 Completed. 3 files moved."));
        assert!(html.contains("Loaded 2 conversations."));
        assert!(html.contains("<code>1BVts</code>"));
    }
}
