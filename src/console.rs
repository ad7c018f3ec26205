//! Terminal presentation for the rufw binary
//!
//! Tables, field prompts, single-key confirmation and error reports. Nothing
//! here talks to ufw; the binary passes in listings and errors.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ipnetwork::IpNetwork;
use rufw::core::decode::{decode, decode_text};
use rufw::core::error::{Error, MutationError};
use rufw::core::fields::interface_index;
use rufw::core::listing::{Listing, ParsedLine};
use rufw::core::rule::{Action, DisplayRow, Protocol};
use rufw::core::synth::{FormErrors, FormInput, synthesize};
use rufw::utils::truncate_string;
use rufw::validators;
use std::io::{self, BufRead, Write};
use std::os::fd::AsFd;

const COMMENT_WIDTH: usize = 40;

pub fn is_interactive() -> bool {
    nix::unistd::isatty(io::stdin().as_fd()).unwrap_or(false)
}

/// Prints the listing as a table, or as canonical rows
pub fn print_listing(listing: &Listing, canonical: bool) {
    println!(
        "Status: {}",
        if listing.active { "active" } else { "inactive" }
    );
    if listing.is_empty() {
        println!("No rules.");
        return;
    }
    println!();
    print_lines(&listing.lines, canonical);
}

pub fn print_lines(lines: &[ParsedLine], canonical: bool) {
    if canonical {
        for line in lines {
            println!("{}", line.row);
        }
        return;
    }
    print!("{}", render_table(lines));
}

/// Renders decoded rows as aligned columns; rows that do not decode are
/// shown verbatim below the table
pub fn render_table(lines: &[ParsedLine]) -> String {
    let mut rows = Vec::with_capacity(lines.len());
    let mut undecoded = Vec::new();

    for line in lines {
        match decode(&line.row) {
            Some(rule) => {
                let mut row = rule.display_row();
                if line.ipv6 {
                    row.index.push_str(" v6");
                }
                row.comment = truncate_string(&row.comment, COMMENT_WIDTH);
                rows.push(row);
            }
            None => undecoded.push(line.raw.as_str()),
        }
    }

    let mut widths = DisplayRow::HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &DisplayRow::HEADERS, &widths);
    let rule_line = widths.map(|w| "-".repeat(w));
    push_row(&mut out, &rule_line.each_ref().map(String::as_str), &widths);
    for row in &rows {
        push_row(&mut out, &row.cells(), &widths);
    }
    for raw in undecoded {
        out.push_str(raw);
        out.push('\n');
    }
    out
}

fn push_row(out: &mut String, cells: &[&str; 6], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn read_answer() -> io::Result<String> {
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(answer.trim().to_string())
}

/// Asks for one text field. Enter keeps `current`, a lone `-` clears it.
pub fn prompt(label: &str, current: &str) -> io::Result<String> {
    print!("{label} [{current}]: ");
    io::stdout().flush()?;
    let answer = read_answer()?;
    Ok(match answer.as_str() {
        "" => current.to_string(),
        "-" => String::new(),
        _ => answer,
    })
}

pub fn choose_action(current: Action) -> io::Result<Action> {
    let choices = Action::choices();
    for (i, action) in choices.iter().enumerate() {
        println!("  {i:>2}) {}", action.form_text());
    }
    loop {
        let answer = prompt("Action", &current.form_text())?;
        if let Some(action) = answer.parse::<usize>().ok().and_then(|i| choices.get(i)) {
            return Ok(*action);
        }
        match answer.parse() {
            Ok(action) => return Ok(action),
            Err(e) => println!("  {e}"),
        }
    }
}

fn choose_protocol(current: Option<Protocol>) -> io::Result<Option<Protocol>> {
    let shown = current.as_ref().map_or("any", AsRef::as_ref);
    loop {
        let answer = prompt("Protocol (tcp, udp, any)", shown)?;
        if answer.is_empty() || answer.eq_ignore_ascii_case("any") {
            return Ok(None);
        }
        match answer.parse() {
            Ok(proto) => return Ok(Some(proto)),
            Err(_) => println!("  expected tcp, udp or any"),
        }
    }
}

/// Picks an interface by number or name; `known[0]` is the empty "any" choice
pub fn choose_interface(label: &str, known: &[String], current: &str) -> io::Result<String> {
    let default = interface_index(current, known);
    for (i, name) in known.iter().enumerate() {
        let shown = if name.is_empty() { "any" } else { name.as_str() };
        let marker = if i == default { '*' } else { ' ' };
        println!(" {marker}{i:>2}) {shown}");
    }

    print!("{label} [{default}]: ");
    io::stdout().flush()?;
    let answer = read_answer()?;
    if answer.is_empty() {
        return Ok(known.get(default).cloned().unwrap_or_default());
    }
    if let Some(name) = answer.parse::<usize>().ok().and_then(|i| known.get(i)) {
        return Ok(name.clone());
    }
    Ok(if answer == "any" { String::new() } else { answer })
}

/// Walks the operator through every field of `form`
pub fn edit_form(mut form: FormInput, known: &[String]) -> io::Result<FormInput> {
    form.action = choose_action(form.action)?;
    form.to = prompt("To (address, empty for any)", &form.to)?;
    form.port = prompt("Port (e.g. 22, 80,443, 8000:9000)", &form.port)?;
    form.protocol = choose_protocol(form.protocol)?;

    let label = if form.action.is_forward() {
        "Inbound interface"
    } else {
        "Interface"
    };
    form.interface = choose_interface(label, known, &form.interface)?;
    form.interface_out = if form.action.is_forward() {
        let current = form.interface_out.unwrap_or_default();
        Some(choose_interface("Outbound interface", known, &current)?).filter(|s| !s.is_empty())
    } else {
        None
    };

    form.from = prompt("From (address, empty for any)", &form.from)?;
    form.comment = prompt("Comment", &form.comment)?;

    for hint in hints(&form) {
        println!("  note: {hint}");
    }
    Ok(form)
}

/// Informational notes about well-known ports and reserved ranges
fn hints(form: &FormInput) -> Vec<String> {
    let mut notes = Vec::new();
    if let Ok(port) = form.port.trim().parse::<u16>()
        && let Some(note) = validators::check_well_known_port(port)
    {
        notes.push(note);
    }
    for address in [&form.to, &form.from] {
        if let Ok(net) = address.trim().parse::<IpNetwork>()
            && let Some(note) = validators::check_reserved_ip(net)
        {
            notes.push(format!("{address}: {note}"));
        }
    }
    notes
}

/// Yes/no question; a single `y` keypress on a terminal, a line otherwise
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    if !is_interactive() {
        let answer = read_answer().unwrap_or_default();
        return Ok(matches!(answer.as_str(), "y" | "Y" | "yes"));
    }

    crossterm::terminal::enable_raw_mode()?;
    let answer = loop {
        match event::read() {
            Ok(Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            })) => break Ok(matches!(code, KeyCode::Char('y' | 'Y'))),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };
    // Always restore the terminal before printing
    let _ = crossterm::terminal::disable_raw_mode();
    println!();
    answer
}

pub fn print_error(err: &Error) {
    let translation = err.translate();
    eprintln!("✗ {}", translation.user_message);
    for suggestion in &translation.suggestions {
        eprintln!("  • {suggestion}");
    }
    if let Some(url) = &translation.help_url {
        eprintln!("  See: {url}");
    }
    tracing::debug!("Reported error: {err}");
}

pub fn print_form_errors(errors: &FormErrors) {
    eprintln!("✗ The rule is not valid:");
    for (field, message) in errors.iter() {
        eprintln!("  • {field}: {message}");
    }
}

pub fn print_mutation_error(err: &MutationError) {
    match err {
        MutationError::UnknownRow(row) => {
            eprintln!("✗ There is no rule {row}. Refresh with `rufw list` and pick the row again.");
        }
        MutationError::SourcePortUnsupported { row, port } => {
            eprintln!("✗ Rule {row} only matches source port {port}; an edit would widen it. Nothing was changed.");
            eprintln!("  Delete it and add the replacement with ufw directly to keep the source port.");
        }
        MutationError::Rejected(_) => {
            eprintln!("✗ ufw rejected the rule in its dry run. Nothing was changed.");
        }
        MutationError::DeleteFailed { row, .. } => {
            eprintln!("✗ Rule {row} could not be deleted. Nothing was changed.");
        }
        MutationError::ApplyFailed(_) => {
            eprintln!("✗ The rule passed its dry run but could not be applied. Nothing was changed.");
        }
        MutationError::ReplacementLost { row, deleted, .. } => {
            eprintln!("✗ Rule {row} was DELETED but its replacement could not be applied.");
            eprintln!("  Deleted rule: {deleted}");
            if let Some(pair) = decode_text(deleted).and_then(|rule| synthesize(&FormInput::from_rule(&rule))) {
                eprintln!("  To restore it, run: sudo {}", pair.apply);
            }
        }
    }
    if let Some(cause) = err.cause() {
        print_error(cause);
    }
}
