//! JavaScript probe and action builders
//!
//! Every script is an IIFE that returns a JSON-encoded string, so the
//! evaluation result is always a plain string regardless of what the page
//! defines. Scripts start with `const sel`/`const probe` headers naming the
//! selector and probe kind; the payload echoes them back for diagnostics.

/// Escape a string for safe embedding in single-quoted JavaScript
///
/// Handles backslashes, quotes, and newlines so selectors and text arguments
/// cannot break out of the generated script.
pub fn escape_js_str(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', r#"\""#)
        .replace('\n', "\\n")
}

/// Visibility helper shared by the probes: returns `null` for a visible
/// element or a short reason string. `<option>` elements report a zero box in
/// headless Chrome, so they are judged by their owning `<select>`.
const HIDDEN_STATE_FN: &str = r#"const hiddenState = (el) => {
        if (el.tagName === 'OPTION') {
            const owner = el.closest('select');
            return owner ? hiddenState(owner) : 'detached_option';
        }
        const style = window.getComputedStyle(el);
        if (style.display === 'none') return 'display_none';
        if (style.visibility === 'hidden' || style.visibility === 'collapse') return 'visibility_hidden';
        if (style.opacity === '0') return 'opacity_zero';
        const rect = el.getBoundingClientRect();
        if (rect.width <= 0 || rect.height <= 0) return 'zero_size';
        return null;
    };"#;

/// Probe: is some element matching the selector visible?
pub fn visibility_probe(selector: &str) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'visible';
    {}
    const els = document.querySelectorAll(sel);
    if (els.length === 0) {{
        return JSON.stringify({{ probe, selector: sel, visible: false, reason: 'not_found' }});
    }}
    let firstReason = null;
    for (const el of els) {{
        const state = hiddenState(el);
        if (state === null) {{
            return JSON.stringify({{ probe, selector: sel, visible: true, reason: null }});
        }}
        if (firstReason === null) firstReason = state;
    }}
    return JSON.stringify({{ probe, selector: sel, visible: false, reason: firstReason }});
}})()"#,
        escape_js_str(selector),
        HIDDEN_STATE_FN
    )
}

/// Probe: trimmed text content of every visible element matching the
/// selector (capped so a runaway selector cannot flood the wire)
pub fn texts_probe(selector: &str) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'texts';
    {}
    const els = Array.from(document.querySelectorAll(sel));
    const texts = [];
    for (const el of els) {{
        if (hiddenState(el) === null) {{
            texts.push((el.textContent || '').trim());
            if (texts.length >= 50) break;
        }}
    }}
    return JSON.stringify({{ probe, selector: sel, total: els.length, texts }});
}})()"#,
        escape_js_str(selector),
        HIDDEN_STATE_FN
    )
}

/// Probe: is the index-th match of the selector visible?
pub fn nth_visibility_probe(selector: &str, index: usize) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'nth_visible';
    const idx = {};
    {}
    const els = document.querySelectorAll(sel);
    if (els.length <= idx) {{
        return JSON.stringify({{ probe, selector: sel, index: idx, count: els.length, visible: false, reason: 'too_few_matches' }});
    }}
    const state = hiddenState(els[idx]);
    return JSON.stringify({{ probe, selector: sel, index: idx, count: els.length, visible: state === null, reason: state }});
}})()"#,
        escape_js_str(selector),
        index,
        HIDDEN_STATE_FN
    )
}

/// Probe: page-absolute bounding rect of the first match, for clipped
/// screenshots
pub fn rect_probe(selector: &str) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'rect';
    const el = document.querySelector(sel);
    if (!el) {{
        return JSON.stringify({{ probe, selector: sel, found: false, reason: 'not_found' }});
    }}
    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) {{
        return JSON.stringify({{ probe, selector: sel, found: false, reason: 'zero_size' }});
    }}
    return JSON.stringify({{
        probe, selector: sel, found: true,
        x: rect.x + window.scrollX, y: rect.y + window.scrollY,
        width: rect.width, height: rect.height
    }});
}})()"#,
        escape_js_str(selector)
    )
}

/// Action: set a `<select>`'s selected index and fire the events frameworks
/// listen for
pub fn select_option_script(selector: &str, index: usize) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'select_option';
    const idx = {};
    const el = document.querySelector(sel);
    if (!el) return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'not_found' }});
    if (el.tagName !== 'SELECT') return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'not_a_select' }});
    if (el.disabled) return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'disabled' }});
    if (idx >= el.options.length) return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'index_out_of_range' }});
    el.selectedIndex = idx;
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return JSON.stringify({{ probe, selector: sel, ok: true, reason: null }});
}})()"#,
        escape_js_str(selector),
        index
    )
}

/// Action: scroll the first match into view and click it
pub fn click_script(selector: &str) -> String {
    format!(
        r#"(() => {{
    const sel = '{}';
    const probe = 'click';
    const el = document.querySelector(sel);
    if (!el) return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'not_found' }});
    if (el.disabled) return JSON.stringify({{ probe, selector: sel, ok: false, reason: 'disabled' }});
    el.scrollIntoView({{ block: 'center', inline: 'center' }});
    el.click();
    return JSON.stringify({{ probe, selector: sel, ok: true, reason: null }});
}})()"#,
        escape_js_str(selector)
    )
}
