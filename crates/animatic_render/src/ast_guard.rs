//! Static checks run inside the sandbox with the sandbox's own interpreter.
//!
//! Both programs take the scene file as their first argument, print one
//! problem per line to stderr and exit non-zero when any is found.

/// Rejects imports and calls that reach outside the animation.
pub const AST_GUARD_PROGRAM: &str = r#"import ast
import sys

BANNED_MODULES = {
    "subprocess", "socket", "shutil", "ctypes", "multiprocessing",
    "requests", "urllib", "http", "ftplib", "smtplib", "pty",
}
BANNED_CALLS = {"eval", "exec", "compile", "__import__", "open", "input", "breakpoint"}
BANNED_ATTRIBUTES = {
    ("os", "system"), ("os", "popen"), ("os", "remove"), ("os", "unlink"),
    ("os", "rmdir"), ("os", "removedirs"), ("os", "execv"), ("os", "fork"),
    ("shutil", "rmtree"), ("sys", "exit"),
}

path = sys.argv[1]
with open(path, encoding="utf-8") as handle:
    tree = ast.parse(handle.read(), path)

problems = []
for node in ast.walk(tree):
    if isinstance(node, ast.Import):
        for alias in node.names:
            if alias.name.split(".")[0] in BANNED_MODULES:
                problems.append(f"line {node.lineno}: import of '{alias.name}' is not allowed")
    elif isinstance(node, ast.ImportFrom):
        module = node.module or ""
        if module.split(".")[0] in BANNED_MODULES:
            problems.append(f"line {node.lineno}: import from '{module}' is not allowed")
    elif isinstance(node, ast.Call):
        func = node.func
        if isinstance(func, ast.Name) and func.id in BANNED_CALLS:
            problems.append(f"line {node.lineno}: call to '{func.id}' is not allowed")
        elif (
            isinstance(func, ast.Attribute)
            and isinstance(func.value, ast.Name)
            and (func.value.id, func.attr) in BANNED_ATTRIBUTES
        ):
            problems.append(f"line {node.lineno}: call to '{func.value.id}.{func.attr}' is not allowed")

for problem in problems:
    print(problem, file=sys.stderr)
sys.exit(1 if problems else 0)
"#;

/// Checks that the requested Scene subclass exists with a `construct(self)`.
///
/// Takes the expected scene name as its second argument.
pub const SCENE_CHECK_PROGRAM: &str = r#"import ast
import sys

path, expected = sys.argv[1], sys.argv[2]
with open(path, encoding="utf-8") as handle:
    tree = ast.parse(handle.read(), path)

def fail(message):
    print(message, file=sys.stderr)
    sys.exit(1)

scenes = [
    node for node in tree.body
    if isinstance(node, ast.ClassDef)
    and any("Scene" in ast.unparse(base) for base in node.bases)
]
if not scenes:
    fail("No Scene subclass defined")

names = [scene.name for scene in scenes]
if expected not in names:
    fail(f"Scene '{expected}' not found (found: {', '.join(names)})")

scene = next(scene for scene in scenes if scene.name == expected)
construct = [
    node for node in scene.body
    if isinstance(node, (ast.FunctionDef, ast.AsyncFunctionDef)) and node.name == "construct"
]
if not construct:
    fail(f"Scene '{expected}' has no construct method")

args = construct[0].args.args
if not args or args[0].arg != "self":
    fail(f"Scene '{expected}'.construct must take self as its first argument")

if len(construct[0].body) == 0:
    fail(f"Scene '{expected}'.construct is empty")
"#;
