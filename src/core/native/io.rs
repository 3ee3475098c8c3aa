use crate::core::node::{FireContext, NodeKey, NodeLogic};
use crate::core::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoOp {
    Print,
    PrintLine,
    ReadLine,
    ReadKey,
    Clear,
}

impl IoOp {
    pub const ALL: [IoOp; 5] = [
        IoOp::Print,
        IoOp::PrintLine,
        IoOp::ReadLine,
        IoOp::ReadKey,
        IoOp::Clear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IoOp::Print => "Print",
            IoOp::PrintLine => "PrintLine",
            IoOp::ReadLine => "ReadLine",
            IoOp::ReadKey => "ReadKey",
            IoOp::Clear => "Clear",
        }
    }
}

/// 1-in/1-out console effect.
///
/// Every op performs its effect and then forwards its input unchanged, so
/// console nodes can be chained to sequence effects. The readers consume a
/// line or a key from the console and drop it.
#[derive(Clone, Debug)]
pub struct ConsoleNode {
    op: IoOp,
}

impl ConsoleNode {
    pub fn new(op: IoOp) -> Self {
        ConsoleNode { op }
    }
}

impl NodeLogic for ConsoleNode {
    fn key(&self) -> NodeKey {
        NodeKey::new("IO", self.op.name())
    }

    fn inputs(&self) -> usize {
        1
    }

    fn outputs(&self) -> usize {
        1
    }

    fn fire(&mut self, inputs: &[Signal], ctx: &mut FireContext<'_>) {
        let input = inputs[0].clone();
        let forwarded = match self.op {
            IoOp::Print => {
                ctx.console().write(&input.to_string());
                input
            }
            IoOp::PrintLine => {
                ctx.console().write(&format!("{input}\n"));
                input
            }
            IoOp::Clear => {
                ctx.console().clear();
                input
            }
            IoOp::ReadLine => {
                let line = ctx.console().read_line();
                log::debug!("read line {:?}", line);
                input
            }
            IoOp::ReadKey => {
                let key = ctx.console().read_key();
                log::debug!("read key {:?}", key);
                input
            }
        };
        ctx.emit(0, forwarded);
    }

    fn clone_box(&self) -> Box<dyn NodeLogic> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::console::BufferConsole;
    use crate::core::native::fire_with;

    #[test]
    fn test_print_nodes_write_and_forward() {
        let console = BufferConsole::new();
        let mut print = ConsoleNode::new(IoOp::Print);
        let mut line = ConsoleNode::new(IoOp::PrintLine);
        assert_eq!(
            fire_with(&mut print, &[Signal::Int(4)], console.clone()),
            vec![(0, Signal::Int(4))]
        );
        fire_with(&mut line, &[Signal::from("hi")], console.clone());
        assert_eq!(console.writes(), vec!["4".to_string(), "hi\n".to_string()]);
    }

    #[test]
    fn test_readers_consume_input_and_forward_their_pulse() {
        let console = BufferConsole::with_input(["name", "y", "rest"]);
        let mut read_line = ConsoleNode::new(IoOp::ReadLine);
        let mut read_key = ConsoleNode::new(IoOp::ReadKey);
        assert_eq!(
            fire_with(&mut read_line, &[Signal::NaN], console.clone()),
            vec![(0, Signal::NaN)]
        );
        assert_eq!(
            fire_with(&mut read_key, &[Signal::Int(3)], console.clone()),
            vec![(0, Signal::Int(3))]
        );
        assert_eq!(console.transcript().input, vec!["rest".to_string()]);
        assert_eq!(
            fire_with(&mut read_line, &[Signal::from("go")], console.clone()),
            vec![(0, Signal::from("go"))]
        );
        // Exhausted input changes nothing.
        assert_eq!(
            fire_with(&mut read_key, &[Signal::Int(9)], console.clone()),
            vec![(0, Signal::Int(9))]
        );
        assert!(console.transcript().input.is_empty());
    }

    #[test]
    fn test_clear_forwards_input() {
        let console = BufferConsole::new();
        let mut clear = ConsoleNode::new(IoOp::Clear);
        assert_eq!(
            fire_with(&mut clear, &[Signal::Int(1)], console.clone()),
            vec![(0, Signal::Int(1))]
        );
        assert_eq!(console.transcript().clears, 1);
    }
}
