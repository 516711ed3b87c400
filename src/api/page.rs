//! Server-rendered form page (self-contained, no external resources).

use crate::session::{LeafContext, Rating, SEASONS};

/// Everything the page render needs, snapshotted from the session under
/// one lock.
#[derive(Debug)]
pub struct PageView {
    pub image_name: Option<String>,
    pub context: LeafContext,
    pub prompt: String,
    pub result: Option<ResultView>,
    pub warnings: Vec<String>,
    pub notice: Option<String>,
}

#[derive(Debug)]
pub struct ResultView {
    pub text: String,
    pub is_failure: bool,
}

/// Render the full page for the given view.
pub fn render_page(view: &PageView) -> String {
    let mut flashes = String::new();
    for warning in &view.warnings {
        flashes.push_str(&format!(
            "<div class=\"flash warning\">{}</div>\n",
            html_escape(warning)
        ));
    }
    if let Some(notice) = &view.notice {
        flashes.push_str(&format!(
            "<div class=\"flash notice\">{}</div>\n",
            html_escape(notice)
        ));
    }

    let preview = match &view.image_name {
        Some(name) => format!(
            "<img class=\"preview\" src=\"/images/{name}\" alt=\"Current leaf image\">\n\
             <p class=\"current\">Current image: {name}</p>",
            name = html_escape(name)
        ),
        None => "<p class=\"current\">No image selected yet.</p>".to_string(),
    };

    let result_section = match &view.result {
        Some(result) => {
            let class = if result.is_failure { "error" } else { "success" };
            format!(
                r#"<section class="card">
  <h2>Result</h2>
  <div class="result {class}">{text}</div>
  <form method="post" action="/feedback">
    <fieldset>
      <legend>How accurate was the diagnosis?</legend>
      {ratings}
    </fieldset>
    <label>Any suggestions or corrections?
      <textarea name="notes" rows="3" placeholder="E.g., it missed yellow spots on the leaf..."></textarea>
    </label>
    <button type="submit">Submit feedback</button>
  </form>
</section>"#,
                class = class,
                text = html_escape(&result.text),
                ratings = rating_options(),
            )
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Foliar — Leaf Diagnosis</title>
  <style>{style}</style>
</head>
<body>
  <h1>Foliar</h1>
  <p class="tagline">Upload a plant leaf image or paste a URL to analyze possible diseases.</p>
  {flashes}
  <section class="card">
    <h2>Leaf image</h2>
    {preview}
    <form method="post" action="/upload" enctype="multipart/form-data">
      <input type="file" name="file" accept=".jpg,.jpeg,.png">
      <button type="submit">Upload image</button>
    </form>
    <form method="post" action="/fetch">
      <input type="text" name="url" placeholder="https://example.com/leaf.jpg">
      <button type="submit">Fetch from URL</button>
    </form>
  </section>
  <section class="card">
    <h2>Context &amp; prompt</h2>
    <form method="post" action="/analyze">
      <label>Plant species
        <input name="species" value="{species}" placeholder="e.g., Tomato, Wheat">
      </label>
      <label>Location / region
        <input name="region" value="{region}">
      </label>
      <label>Current season
        <select name="season">{seasons}</select>
      </label>
      <label>Prompt (you can modify this)
        <textarea name="prompt" rows="8">{prompt}</textarea>
      </label>
      <button type="submit">Analyze image</button>
    </form>
  </section>
  {result_section}
</body>
</html>"#,
        style = PAGE_STYLE,
        flashes = flashes,
        preview = preview,
        species = html_escape(&view.context.species),
        region = html_escape(&view.context.region),
        seasons = season_options(&view.context.season),
        prompt = html_escape(&view.prompt),
        result_section = result_section,
    )
}

fn season_options(selected: &str) -> String {
    SEASONS
        .iter()
        .map(|season| {
            let label = if season.is_empty() { "—" } else { season };
            let selected_attr = if *season == selected { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                html_escape(season),
                selected_attr,
                html_escape(label)
            )
        })
        .collect()
}

fn rating_options() -> String {
    Rating::ALL
        .iter()
        .map(|rating| {
            format!(
                "<label class=\"rating\"><input type=\"radio\" name=\"rating\" value=\"{0}\" required> {0}</label>",
                html_escape(rating.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ")
}

/// Minimal HTML escaping for text and attribute positions.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

const PAGE_STYLE: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
  background: #fafaf9; color: #1c1917;
  max-width: 720px; margin: 0 auto; padding: 24px;
}
h1 { font-size: 28px; margin-bottom: 4px; }
.tagline { color: #78716c; font-size: 14px; margin-bottom: 20px; }
.card {
  background: white; border: 1px solid #e7e5e4; border-radius: 12px;
  padding: 20px; margin-bottom: 16px;
}
.card h2 { font-size: 18px; margin-bottom: 12px; }
label { display: block; margin-bottom: 12px; font-size: 14px; color: #44403c; }
input[type=text], input:not([type]), select, textarea {
  display: block; width: 100%; margin-top: 4px; padding: 8px;
  border: 1px solid #d6d3d1; border-radius: 8px; font: inherit;
}
textarea { resize: vertical; }
button {
  background: #4a7c59; color: white; border: none; border-radius: 8px;
  padding: 10px 18px; font-size: 15px; cursor: pointer; margin-top: 4px;
}
form { margin-bottom: 12px; }
.preview { max-width: 100%; border-radius: 8px; margin-bottom: 8px; }
.current { color: #78716c; font-size: 13px; margin-bottom: 12px; }
.flash { padding: 12px; border-radius: 8px; margin-bottom: 12px; font-size: 14px; }
.flash.warning { background: #fef3c7; color: #92400e; }
.flash.notice { background: #dcfce7; color: #166534; }
.result { padding: 12px; border-radius: 8px; white-space: pre-wrap; margin-bottom: 16px; }
.result.success { background: #f0fdf4; color: #14532d; }
.result.error { background: #fef2f2; color: #991b1b; }
fieldset { border: none; margin-bottom: 12px; }
legend { font-size: 14px; color: #44403c; margin-bottom: 8px; }
.rating { display: block; margin-bottom: 4px; }
"#;
