use super::constants::{APP_TITLE, REFRESH_SECS};

/// Page-wide facts that do not come from the session's view model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageChrome {
    /// The surface listens on a non-loopback address.
    pub public_host: bool,
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; color: #1d1d1f; }
h1 { font-size: 1.6rem; }
h2 { font-size: 1.15rem; margin-top: 2rem; }
section { margin-bottom: 1.5rem; }
label { display: block; margin: .6rem 0 .2rem; font-weight: 600; }
input, select { width: 100%; padding: .45rem; box-sizing: border-box; }
button { margin-top: .8rem; padding: .5rem 1.1rem; cursor: pointer; }
button:disabled { cursor: not-allowed; opacity: .5; }
.inline { display: inline-block; margin-right: .5rem; }
.banner { padding: .7rem 1rem; border-radius: 6px; margin: 1rem 0; }
.error { background: #fde8e8; border: 1px solid #f5b5b5; }
.warning { background: #fff6db; border: 1px solid #f0d98a; }
.info { background: #e8f1fd; border: 1px solid #b5cff5; }
.success { background: #e6f6ea; border: 1px solid #a9dcb6; }
.qr img { width: 250px; height: 250px; image-rendering: pixelated; }
.log { background: #f5f5f7; padding: .8rem; max-height: 18rem; overflow-y: auto; font-family: ui-monospace, monospace; font-size: .85rem; white-space: pre-wrap; }
code { word-break: break-all; }
"#;

/// Wraps rendered sections into a complete document. `refresh` makes the
/// browser reload the page on its own while work is in flight.
pub fn page(body: &str, refresh: bool, chrome: &PageChrome) -> String {
    let refresh_tag = if refresh {
        format!(r#"<meta http-equiv="refresh" content="{REFRESH_SECS}">"#)
    } else {
        String::new()
    };
    let warning = if chrome.public_host {
        r#"<div class="banner warning">This control panel is reachable from other machines. Use it for one-off migrations only and do not share its address while you use it.</div>"#
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{refresh_tag}
<title>{APP_TITLE}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>📲 {APP_TITLE}</h1>
{warning}
{body}
</body>
</html>
"#
    )
}
