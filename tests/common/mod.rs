use assert_cmd::Command;

pub fn shelfmark_bin() -> Command {
    #[allow(deprecated)]
    {
        Command::cargo_bin("shelfmark").expect("shelfmark test binary should build")
    }
}
