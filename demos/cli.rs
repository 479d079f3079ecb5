use recassign::{
    ops::Builtins, parse_equation, print, report::SiUnits, solution_statement,
    Expression, SolvedValues, StatementStyle, VariableTable,
};
use std::{
    collections::BTreeSet,
    io::{BufRead, BufReader},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut variables = VariableTable::new();
    let mut equations = Vec::new();
    let stdin = std::io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_equation(&line, &mut variables) {
            Ok(equation) => equations.push(equation),
            Err(e) => eprintln!("Unable to parse \"{}\": {}", line, e),
        }
    }

    let mut unknowns: BTreeSet<_> = variables.ids().collect();
    let names = unknowns
        .iter()
        .map(|&id| variables.name(id).map(String::from))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Solving for {}", names.join(", "));

    let mut solutions = Vec::new();
    recassign::recassign(
        &mut equations,
        &mut unknowns,
        &mut solutions,
        &Builtins,
        &variables,
    )?;

    println!("Found:");
    let mut values = SolvedValues::for_table(&variables);

    for solution in solutions {
        let statement = solution_statement(
            &Expression::from(solution),
            &variables,
            &mut values,
            &SiUnits,
            StatementStyle::Solution,
        )?;
        println!("  {}", statement);
    }

    if !equations.is_empty() {
        println!("Still pending:");

        for equation in equations {
            let rendered =
                print::infix(&Expression::from(equation), &variables)?;
            println!("  {}", rendered);
        }
    }

    Ok(())
}
