use crate::app::formatting::{format_output, Output};
use crate::config::cli::OutputFormat;
use crate::config::SoftLayerSettings;
use crate::core::Client;
use crate::transport::DebugTransport;
use crate::utils::error::{Result, SoftLayerError};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Per-invocation state shared by every command: the client, output format,
/// confirmation policy and the streams commands write to.
pub struct Environment {
    pub client: Client,
    pub format: OutputFormat,
    pub skip_confirmations: bool,
    pub demo: bool,
    pub config_file: Option<PathBuf>,
    /// 解析後的設定（`config show` 使用）
    pub settings: SoftLayerSettings,
    debug: Option<Arc<DebugTransport>>,
    out: Box<dyn Write + Send>,
    input: Box<dyn BufRead + Send>,
}

impl Environment {
    pub fn new(client: Client, format: OutputFormat) -> Self {
        Self {
            client,
            format,
            skip_confirmations: false,
            demo: false,
            config_file: None,
            settings: SoftLayerSettings::default(),
            debug: None,
            out: Box::new(std::io::stdout()),
            input: Box::new(BufReader::new(std::io::stdin())),
        }
    }

    /// 以其他串流取代 stdout / stdin
    pub fn with_io(mut self, out: Box<dyn Write + Send>, input: Box<dyn BufRead + Send>) -> Self {
        self.out = out;
        self.input = input;
        self
    }

    pub fn skip_confirmations(mut self, really: bool) -> Self {
        self.skip_confirmations = really;
        self
    }

    /// 所有呼叫改經 `DebugTransport`，結束時可輸出診斷資訊
    pub fn with_call_log(mut self) -> Self {
        let debug = Arc::new(DebugTransport::new(Box::new(self.client.transport().clone())));
        self.client = Client::new(debug.clone(), self.client.auth().cloned());
        self.debug = Some(debug);
        self
    }

    pub fn call_log(&self) -> Option<&DebugTransport> {
        self.debug.as_deref()
    }

    pub fn fmt(&self, output: &Output) -> Result<String> {
        format_output(output, self.format)
    }

    /// 依目前格式輸出到 stdout
    pub fn fout(&mut self, output: impl Into<Output>) -> Result<()> {
        let text = self.fmt(&output.into())?;
        self.out(&text)
    }

    pub fn out(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn err(&self, text: &str) {
        eprintln!("{}", text);
    }

    pub fn input(&mut self, prompt: &str) -> Result<String> {
        eprint!("{}", prompt);
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// `y` / `yes` 為同意；空白回覆採用預設值
    pub fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let choices = if default { "Y/n" } else { "y/N" };
        let answer = self.input(&format!("{} [{}]: ", prompt, choices))?.to_lowercase();
        Ok(match answer.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    /// 必須輸入 `confirmation` 本身才算同意（不分大小寫）
    pub fn no_going_back(&mut self, confirmation: &str) -> Result<bool> {
        let answer = self.input(&format!(
            "This action cannot be undone! Type \"{}\" or press Enter to abort: ",
            confirmation
        ))?;
        Ok(!answer.is_empty() && answer.eq_ignore_ascii_case(confirmation))
    }

    /// 破壞性動作前的確認；`--really` 略過，拒絕時以 exit code 2 中止
    pub fn require_confirmation(&mut self, confirmation: &str) -> Result<()> {
        if self.skip_confirmations || self.no_going_back(confirmation)? {
            Ok(())
        } else {
            Err(SoftLayerError::abort("Aborted."))
        }
    }
}

/// A clonable in-memory writer, used to capture command output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => inner.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FixtureTransport;
    use std::io::Cursor;

    fn environment(answer: &str) -> (Environment, SharedBuffer) {
        let client = Client::new(Arc::new(FixtureTransport::new()), None);
        let buffer = SharedBuffer::new();
        let env = Environment::new(client, OutputFormat::Raw).with_io(
            Box::new(buffer.clone()),
            Box::new(Cursor::new(answer.to_string().into_bytes())),
        );
        (env, buffer)
    }

    #[test]
    fn test_confirm_answers() {
        let (mut env, _) = environment("yes\n");
        assert!(env.confirm("Continue?", false).unwrap());

        let (mut env, _) = environment("\n");
        assert!(env.confirm("Continue?", true).unwrap());

        let (mut env, _) = environment("nope\n");
        assert!(!env.confirm("Continue?", true).unwrap());
    }

    #[test]
    fn test_require_confirmation() {
        let (mut env, _) = environment("1234\n");
        assert!(env.require_confirmation("1234").is_ok());

        let (mut env, _) = environment("\n");
        let err = env.require_confirmation("1234").unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let (env, _) = environment("");
        let mut env = env.skip_confirmations(true);
        assert!(env.require_confirmation("1234").is_ok());
    }

    #[test]
    fn test_no_going_back_ignores_case() {
        let (mut env, _) = environment("YES\n");
        assert!(env.no_going_back("yes").unwrap());

        let (mut env, _) = environment("web01.Example.COM\n");
        assert!(env.no_going_back("web01.example.com").unwrap());

        let (mut env, _) = environment("no\n");
        assert!(!env.no_going_back("yes").unwrap());
    }

    #[tokio::test]
    async fn test_call_log_records_requests() {
        let (env, buffer) = environment("");
        let mut env = env.with_call_log();
        env.client.call("Account", "getObject").send().await.unwrap();
        env.fout("done").unwrap();

        let log = env.call_log().unwrap();
        assert_eq!(log.requests()[0].method, "getObject");
        assert_eq!(buffer.contents(), "done\n");
    }
}
