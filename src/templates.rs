//! Sample Markdown-rendered documents for testing and demonstration.
//!
//! Each sample is the kind of HTML a Markdown converter emits: a flat run
//! of headings, paragraphs and block elements with no wrapper.

/// Short proposal with every atomic block kind.
pub fn proposal_sample() -> &'static str {
    r##"<h1>Community Print Workshop</h1>
<p>A twelve-week programme of open letterpress and risograph sessions for
neighbourhood collectives, ending in a shared exhibition.</p>
<h2>Objectives</h2>
<ul>
<li>Offer free access to print equipment two evenings a week.</li>
<li>Train <strong>eight</strong> facilitators from local groups.</li>
<li>Publish a collective zine at the end of the programme.</li>
</ul>
<h2>Schedule</h2>
<table>
<thead><tr><th>Phase</th><th>Weeks</th><th>Output</th></tr></thead>
<tbody>
<tr><td>Setup</td><td>1–2</td><td>Studio ready</td></tr>
<tr><td>Workshops</td><td>3–10</td><td>Prints, zine drafts</td></tr>
<tr><td>Exhibition</td><td>11–12</td><td>Public show</td></tr>
</tbody>
</table>
<h2>Budget notes</h2>
<blockquote><p>Materials are bought in bulk at the start of each phase.</p></blockquote>
<h3>Equipment list</h3>
<pre><code>press.model   = "Adana 8x5"
riso.model    = "MZ 770"
inks          = ["black", "fluo pink", "blue"]
</code></pre>
<dl>
<dt>Facilitator</dt><dd>A participant trained to run sessions alone.</dd>
<dt>Zine</dt><dd>A small self-published magazine.</dd>
</dl>
<hr>
<p>Contact the organisers for accessibility arrangements.</p>
"##
}

/// Tiny document that fits on one page under every theme.
pub fn minimal_sample() -> &'static str {
    "<h1>Hello</h1><p>World</p>"
}

/// A long report: `sections` `h2` sections, each with paragraphs, a list
/// and a code block, long enough to need several pages.
pub fn long_report(sections: usize) -> String {
    let mut html = String::from("<h1>Annual Activity Report</h1>\n");
    for s in 1..=sections {
        html.push_str(&format!("<h2>Section {s}</h2>\n"));
        for p in 1..=3 {
            html.push_str(&format!(
                "<p>Paragraph {p} of section {s}. The programme reached new audiences \
                 this period, and attendance at evening sessions grew steadily while \
                 the volunteer team kept the studio open on weekends.</p>\n"
            ));
        }
        html.push_str("<h3>Highlights</h3>\n<ol>\n");
        for i in 1..=4 {
            html.push_str(&format!("<li>Highlight {i} for section {s}</li>\n"));
        }
        html.push_str("</ol>\n");
        html.push_str(&format!(
            "<pre><code>section = {s}\nvisitors = {}\nprints = {}\n</code></pre>\n",
            s * 120,
            s * 37
        ));
    }
    html
}

/// A body fragment wrapped in a full HTML document.
pub fn full_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Sample</title>\
         <style>p {{ color: red; }}</style></head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}
