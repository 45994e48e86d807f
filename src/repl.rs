use std::io::{self, BufRead, Lines};

/// Groups prompt lines into one scannable entry.
/// A line normally ends the entry, but while a string literal is left open
/// (odd number of `"` so far) we keep reading so multi-line strings can be typed.
/// Strings have no escapes, so counting quotes is enough.
pub struct MultilineInput<T: BufRead> {
    lines: Lines<T>,
}

impl<T: BufRead> MultilineInput<T> {
    pub fn new(lines: Lines<T>) -> MultilineInput<T> {
        MultilineInput { lines }
    }
}

impl<T: BufRead> Iterator for MultilineInput<T> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut current_input: Option<String> = None;
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(err)),
                // stdin closed: hand over whatever we have, the scanner reports the open string
                None => return current_input.map(Ok),
            };

            let input = match current_input.take() {
                Some(previous) => previous + "\n" + &line,
                None => line,
            };

            if input.matches('"').count() % 2 == 0 {
                return Some(Ok(input));
            }
            current_input = Some(input);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, Cursor};

    use crate::repl::MultilineInput;

    fn entries(input: &str) -> Vec<String> {
        MultilineInput::new(Cursor::new(input.to_string()).lines())
            .map(|entry| entry.unwrap())
            .collect()
    }

    #[test]
    fn test_one_entry_per_line() {
        assert_eq!(entries("var a = 1;\nprint a;\n"), vec!["var a = 1;", "print a;"]);
    }

    #[test]
    fn test_empty_line_is_an_entry() {
        assert_eq!(entries("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_open_string_keeps_reading() {
        assert_eq!(
            entries("var s = \"one\n\ntwo\";\nprint s;"),
            vec!["var s = \"one\n\ntwo\";", "print s;"]
        );
    }

    #[test]
    fn test_open_string_at_end_of_input_is_flushed() {
        assert_eq!(entries("x = \"never closed\nstill"), vec!["x = \"never closed\nstill"]);
    }
}
