// parser.rs

/// Characters that end a token. Pipe, redirection and sequencing characters
/// only split words here; they carry no operator meaning.
const DELIMITERS: [char; 9] = [' ', '\t', '\n', '\r', '|', '>', '<', '&', ';'];

fn is_delimiter(ch: char) -> bool {
    DELIMITERS.contains(&ch)
}

/// Splits a command line into its argument vector.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    for ch in line.chars() {
        if is_delimiter(ch) {
            if !cur.is_empty() {
                tokens.push(std::mem::take(&mut cur));
            }
        } else {
            cur.push(ch);
        }
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    tokens
}
