// src/process/text.rs
use scraper::ElementRef;

/// Descendant text of `cell`, text nodes joined by a space and whitespace runs collapsed.
pub fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Value of a `colspan`/`rowspan` style attribute; absent or malformed counts as 1.
pub fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

pub fn is_header_cell(cell: ElementRef<'_>) -> bool {
    cell.value().name() == "th"
}

/// Direct element children, skipping text and comments.
pub fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

pub fn children_named<'a>(
    el: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    child_elements(el).filter(move |c| c.value().name() == name)
}

/// The `tr` rows of every `tbody` directly under `table`, in document order.
pub fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    children_named(table, "tbody")
        .flat_map(|tbody| children_named(tbody, "tr"))
        .collect()
}

/// A lone `th` carrying an `id` opens a named region; returns the region name.
pub fn region_marker(cells: &[ElementRef<'_>]) -> Option<String> {
    match cells {
        [only] if is_header_cell(*only) && only.value().attr("id").is_some() => {
            let text = cell_text(*only);
            let name = text.split('(').next().unwrap_or_default().trim();
            Some(name.to_string())
        }
        _ => None,
    }
}
