use std::io;

/// Key of the line delimiting progress records
pub const SENTINEL_KEY: &str = "progress";
/// Sentinel written by ffmpeg once the job is done
pub const FINISHED: &str = "progress=end";

/// Single `key=value` line of a progress record
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    /// Split a line on its first `=`
    pub fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once('=')?;
        Some(Self {
            key: key.trim().to_owned(),
            value: value.trim().to_owned(),
        })
    }

    pub fn is_sentinel(&self) -> bool {
        self.key == SENTINEL_KEY
    }
}

/// Extract the latest progress record from lines read backward
///
/// Returns `None` when the job has finished (`progress=end`).
/// Otherwise, returns the fields written after the last but one sentinel,
/// that is every field of the most recent record, latest first.
/// Reading stops at that sentinel so older records are never read.
pub fn latest_record<I>(lines: I) -> io::Result<Option<Vec<Field>>>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut lines = lines.into_iter();
    let mut fields = Vec::new();

    // ffmpeg sometimes leaves an empty line after the last sentinel
    let first = match lines.next().transpose()? {
        Some(line) if line.trim().is_empty() => lines.next().transpose()?,
        line => line,
    };
    let Some(first) = first else {
        return Ok(Some(fields));
    };

    let first = first.trim();
    if first == FINISHED {
        return Ok(None);
    }
    // Record still being written: its first line is already a field
    push_field(&mut fields, first);

    for line in lines {
        let line = line?;
        if Field::parse(&line).is_some_and(|field| field.is_sentinel()) {
            break;
        }
        push_field(&mut fields, &line);
    }

    Ok(Some(fields))
}

fn push_field(fields: &mut Vec<Field>, line: &str) {
    match Field::parse(line) {
        Some(field) if field.is_sentinel() => (),
        Some(field) => fields.push(field),
        None if line.trim().is_empty() => (),
        None => log::debug!("Ignore malformed progress line '{line}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> Option<Vec<(String, String)>> {
        let mut lines = content
            .lines()
            .map(|line| Ok::<_, io::Error>(line.to_owned()))
            .collect::<Vec<_>>();
        lines.reverse();

        latest_record(lines)
            .unwrap()
            .map(|fields| fields.into_iter().map(|f| (f.key, f.value)).collect())
    }

    fn fields(pairs: &[(&str, &str)]) -> Option<Vec<(String, String)>> {
        Some(
            pairs
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }

    #[test]
    fn finished() {
        assert_eq!(record("frame=1\nprogress=continue\nframe=2\nprogress=end"), None);
    }

    #[test]
    fn finished_after_blank_line() {
        assert_eq!(record("frame=2\nprogress=end\n\n"), None);
        assert_eq!(record("frame=2\nprogress=end\n"), None);
    }

    #[test]
    fn only_latest_record() {
        assert_eq!(
            record("frame=1\nfps=1\nprogress=continue\nframe=2\nspeed=2x\nprogress=continue\n"),
            fields(&[("speed", "2x"), ("frame", "2")])
        );
    }

    #[test]
    fn first_record() {
        assert_eq!(
            record("frame=1\ntotal_size=48\nprogress=continue"),
            fields(&[("total_size", "48"), ("frame", "1")])
        );
    }

    #[test]
    fn record_without_sentinel() {
        assert_eq!(
            record("frame=1\nprogress=continue\nframe=2\ndup_frames=3"),
            fields(&[("dup_frames", "3"), ("frame", "2")])
        );
    }

    #[test]
    fn empty() {
        assert_eq!(record(""), fields(&[]));
        assert_eq!(record("\n"), fields(&[]));
    }

    #[test]
    fn value_containing_equal_sign() {
        assert_eq!(
            record("frame=1\nextra= a=b \nprogress=continue"),
            fields(&[("extra", "a=b"), ("frame", "1")])
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert_eq!(
            record("progress=continue\nframe=1\ngarbage\n\nspeed=1x\nprogress=continue"),
            fields(&[("speed", "1x"), ("frame", "1")])
        );
    }

    #[test]
    fn io_error() {
        let lines = vec![
            Ok("progress=continue".to_owned()),
            Err(io::Error::other("broken")),
        ];
        assert!(latest_record(lines).is_err());
    }
}
