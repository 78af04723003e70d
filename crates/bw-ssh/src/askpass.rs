//! Passphrase interceptor
//!
//! `ssh-add` is pointed at this executable through `SSH_ASKPASS`. It runs
//! us with the prompt text as the only argument and with its own stdin,
//! which carries the passphrase the provisioner wrote. We echo that line
//! back on stdout and exit.

use bw_ssh_core::Paths;
use std::io::{self, BufRead, Write};
use zeroize::Zeroizing;

/// Whether `args` (program name excluded) is an askpass call for a key
/// under the SSH root.
///
/// Besides the first prompt, ssh-add re-prompts with "Bad passphrase, try
/// again for ..." after a wrong answer; that call must not start the
/// pipeline either.
pub fn is_passphrase_prompt(args: &[String], paths: &Paths) -> bool {
    let [prompt] = args else {
        return false;
    };
    let root = paths.ssh_root.display();
    prompt.contains(&paths.passphrase_prompt())
        || prompt.contains(&format!("Bad passphrase, try again for {root}"))
}

/// Copy `input` to `output` up to and including the first newline
pub fn forward_passphrase(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<()> {
    let mut line = Zeroizing::new(Vec::new());
    input.read_until(b'\n', &mut line)?;
    output.write_all(&line)?;
    output.flush()
}

/// Entry point for the interceptor mode
pub fn run() -> io::Result<()> {
    forward_passphrase(&mut io::stdin().lock(), &mut io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detects_prompt_for_managed_key() {
        let paths = Paths::with_home("/home/alice");
        assert!(is_passphrase_prompt(
            &args(&["Enter passphrase for /home/alice/.ssh/id_work: "]),
            &paths
        ));
        assert!(is_passphrase_prompt(
            &args(&["Bad passphrase, try again for /home/alice/.ssh/id_work: "]),
            &paths
        ));
    }

    #[test]
    fn test_ignores_other_invocations() {
        let paths = Paths::with_home("/home/alice");
        assert!(!is_passphrase_prompt(&[], &paths));
        assert!(!is_passphrase_prompt(
            &args(&["Enter passphrase for /tmp/id_other: "]),
            &paths
        ));
        assert!(!is_passphrase_prompt(
            &args(&["Enter passphrase for /home/alice/.ssh/a: ", "extra"]),
            &paths
        ));
        assert!(!is_passphrase_prompt(&args(&["--help"]), &paths));
    }

    #[test]
    fn test_forwards_first_line() {
        let mut input = io::Cursor::new(b"s3cret\nleftover\n".to_vec());
        let mut output = Vec::new();
        forward_passphrase(&mut input, &mut output).unwrap();
        assert_eq!(output, b"s3cret\n");
    }

    #[test]
    fn test_forwards_until_eof_without_newline() {
        let mut input = io::Cursor::new(b"partial".to_vec());
        let mut output = Vec::new();
        forward_passphrase(&mut input, &mut output).unwrap();
        assert_eq!(output, b"partial");

        let mut empty = io::Cursor::new(Vec::new());
        let mut output = Vec::new();
        forward_passphrase(&mut empty, &mut output).unwrap();
        assert!(output.is_empty());
    }
}
