#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::command::{CommandOutput, CommandRunner, ShellCommand};
    use crate::config::VirtualizeOptions;
    use crate::error::{Error, Result};
    use crate::provision::{VirtualizeOutcome, virtualize_can_with};

    /// Scripted stand-in for a Linux host's `modprobe` and `ip link`.
    #[derive(Default)]
    struct FakeHost {
        links: Mutex<HashSet<String>>,
        up: Mutex<HashSet<String>>,
        history: Mutex<Vec<String>>,
        module_missing: bool,
        /// Replaces the result of `ip link add` when set.
        add_override: Option<CommandOutput>,
    }

    fn ok() -> CommandOutput {
        CommandOutput {
            code: Some(0),
            ..Default::default()
        }
    }

    fn fail(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    impl FakeHost {
        fn history(&self) -> Vec<String> {
            self.history.lock().unwrap().clone()
        }

        fn respond(&self, argv: &[&str]) -> CommandOutput {
            match argv {
                ["modprobe", "vcan"] if self.module_missing => fail(
                    1,
                    "modprobe: FATAL: Module vcan not found in directory /lib/modules\n",
                ),
                ["modprobe", "vcan"] => ok(),
                ["ip", "link", "add", "dev", name, "type", "vcan"] => {
                    if let Some(output) = &self.add_override {
                        return output.clone();
                    }
                    if name.len() > 15 || name.contains(char::is_whitespace) {
                        return fail(
                            255,
                            &format!("Error: argument \"{name}\" is wrong: \"name\" not a valid ifname\n"),
                        );
                    }
                    if !self.links.lock().unwrap().insert(name.to_string()) {
                        return fail(2, "RTNETLINK answers: File exists\n");
                    }
                    ok()
                }
                ["ip", "link", "set", "up", name] => {
                    if !self.links.lock().unwrap().contains(*name) {
                        return fail(1, &format!("Cannot find device \"{name}\"\n"));
                    }
                    self.up.lock().unwrap().insert(name.to_string());
                    ok()
                }
                _ => fail(127, "command not found\n"),
            }
        }
    }

    impl CommandRunner for FakeHost {
        async fn run(&self, command: &ShellCommand, _silent: bool) -> Result<CommandOutput> {
            self.history.lock().unwrap().push(command.to_string());

            let mut argv: Vec<&str> = std::iter::once(command.program())
                .chain(command.get_args().iter().map(String::as_str))
                .collect();
            if argv.first() == Some(&"sudo") {
                argv.remove(0);
            }
            Ok(self.respond(&argv))
        }
    }

    #[tokio::test]
    async fn test_fresh_host_is_virtualized() {
        let host = FakeHost::default();
        let outcome = virtualize_can_with(&host, Some("vcan0"), &VirtualizeOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, VirtualizeOutcome::Virtualized);
        assert_eq!(
            host.history(),
            [
                "sudo modprobe vcan",
                "sudo ip link add dev vcan0 type vcan",
                "sudo ip link set up vcan0",
            ]
        );
        assert!(host.up.lock().unwrap().contains("vcan0"));
    }

    #[tokio::test]
    async fn test_second_call_is_already_virtualized() {
        let host = FakeHost::default();
        let options = VirtualizeOptions::default();

        let first = virtualize_can_with(&host, Some("vcan0"), &options).await.unwrap();
        let second = virtualize_can_with(&host, Some("vcan0"), &options).await.unwrap();

        assert_eq!(first, VirtualizeOutcome::Virtualized);
        assert_eq!(second, VirtualizeOutcome::AlreadyVirtualized);
        // The second call stops after the conflicting `ip link add`.
        assert_eq!(host.history().len(), 5);
    }

    #[tokio::test]
    async fn test_default_interface_is_can0() {
        let host = FakeHost::default();
        virtualize_can_with(&host, None, &VirtualizeOptions::default())
            .await
            .unwrap();
        assert!(host.links.lock().unwrap().contains("can0"));
    }

    #[tokio::test]
    async fn test_without_sudo() {
        let host = FakeHost::default();
        let options = VirtualizeOptions {
            silent: true,
            sudo: false,
        };
        virtualize_can_with(&host, Some("vcan1"), &options)
            .await
            .unwrap();
        assert!(host.history().iter().all(|c| !c.starts_with("sudo")));
    }

    #[tokio::test]
    async fn test_malformed_name_keeps_real_exit_code() {
        let host = FakeHost::default();
        let err = virtualize_can_with(&host, Some("not a valid name"), &VirtualizeOptions::default())
            .await
            .unwrap_err();

        match err {
            Error::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(code, Some(255));
                assert!(command.contains("ip link add"), "command: {command}");
                assert!(stderr.contains("not a valid ifname"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_exit_code_two_with_other_stderr_is_an_error() {
        let host = FakeHost {
            add_override: Some(fail(2, "RTNETLINK answers: Operation not permitted\n")),
            ..Default::default()
        };
        let err = virtualize_can_with(&host, Some("vcan0"), &VirtualizeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(2));
    }

    #[tokio::test]
    async fn test_module_load_failure_stops_sequence() {
        let host = FakeHost {
            module_missing: true,
            ..Default::default()
        };
        let err = virtualize_can_with(&host, Some("vcan0"), &VirtualizeOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(1));
        assert_eq!(host.history(), ["sudo modprobe vcan"]);
    }

    #[tokio::test]
    async fn test_link_up_failure_propagates() {
        // `ip link add` reports success but the device never appears.
        let host = FakeHost {
            add_override: Some(ok()),
            ..Default::default()
        };
        let err = virtualize_can_with(&host, Some("vcan0"), &VirtualizeOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandFailed { code: Some(1), .. }));
        assert_eq!(host.history().len(), 3);
    }
}
